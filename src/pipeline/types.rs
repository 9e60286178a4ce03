//! Shared types for the scrape pipeline.

use std::fmt;
use std::pin::Pin;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use futures::Stream;
use regex::Regex;

use crate::error::ChannelAccessError;

/// Timestamp layout written to the `Timestamp` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ── Channel reference ───────────────────────────────────────────────

// t.me / telegram.me links, with or without scheme.
static LINK_PATTERN: OnceLock<Regex> = OnceLock::new();

fn link_pattern() -> &'static Regex {
    LINK_PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(?:https?://)?(?:www\.)?(?:t|telegram)\.me/(?:s/)?([^/?#]*)")
            .expect("valid regex")
    })
}

/// A channel as listed in the input workbook: a URL or a username.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelRef(String);

impl ChannelRef {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Normalise to a public username.
    ///
    /// `https://t.me/name`, `t.me/s/name`, `@name` and `name` all give
    /// `name`. Invite links (`+hash`, `joinchat/…`) are rejected.
    pub fn username(&self) -> Result<String, ChannelAccessError> {
        let raw = self.0.trim();
        let handle = match link_pattern().captures(raw) {
            Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
            None => raw,
        };

        if handle.starts_with('+') || handle.eq_ignore_ascii_case("joinchat") {
            return Err(ChannelAccessError::Unsupported(self.0.clone()));
        }

        let handle = handle.trim_start_matches('@').trim();
        let valid = !handle.is_empty()
            && handle
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(ChannelAccessError::Unsupported(self.0.clone()));
        }

        Ok(handle.to_string())
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Messages ────────────────────────────────────────────────────────

/// A message as produced by a message source, before filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub id: i64,
    /// Empty for media-only posts.
    pub text: String,
    /// Unix timestamp, seconds.
    pub date: i64,
}

/// A message that passed the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Worksheet row: `[text, "YYYY-MM-DD HH:MM:SS"]`.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.text.clone(),
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        ]
    }
}

/// Lazy, finite stream of raw messages for one channel.
pub type RawMessageStream =
    Pin<Box<dyn Stream<Item = Result<RawMessage, ChannelAccessError>> + Send>>;

/// An opened channel: its display title plus its message stream.
pub struct ChannelFeed {
    /// Chat title, resolved before any message is read.
    pub title: String,
    pub messages: RawMessageStream,
}

// ── Run context ─────────────────────────────────────────────────────

/// Inclusive UTC range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Window of `days` days ending at `end`.
    ///
    /// A span reaching past the earliest representable instant starts there.
    pub fn trailing(end: DateTime<Utc>, days: i64) -> Self {
        let start = Duration::try_days(days)
            .and_then(|span| end.checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// Values fixed for the whole run, passed to every stage.
#[derive(Debug, Clone, Copy)]
pub struct RunContext {
    pub now: DateTime<Utc>,
    pub window: TimeWindow,
}

impl RunContext {
    pub fn new(now: DateTime<Utc>, window_days: i64) -> Self {
        Self {
            now,
            window: TimeWindow::trailing(now, window_days),
        }
    }
}

// ── Run report ──────────────────────────────────────────────────────

/// A channel written to its worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSuccess {
    pub channel: ChannelRef,
    pub worksheet: String,
    pub rows: usize,
}

/// A channel skipped because of an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelFailure {
    pub channel: ChannelRef,
    pub reason: String,
}

/// Summary of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub written: Vec<ChannelSuccess>,
    pub failed: Vec<ChannelFailure>,
    pub notified: bool,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.written.len() + self.failed.len()
    }
}
