//! Message filter: keeps text messages inside the run's time window.

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tracing::warn;

use crate::error::{ChannelAccessError, DataFormatError};
use crate::pipeline::types::{Message, RawMessage, RawMessageStream, TimeWindow};

/// Decide whether one raw message is kept.
///
/// Returns `Ok(None)` for messages outside the window or without text.
pub fn admit(raw: &RawMessage, window: &TimeWindow) -> Result<Option<Message>, DataFormatError> {
    let timestamp = DateTime::<Utc>::from_timestamp(raw.date, 0).ok_or(
        DataFormatError::Timestamp {
            id: raw.id,
            date: raw.date,
        },
    )?;

    if !window.contains(timestamp) || raw.text.is_empty() {
        return Ok(None);
    }

    Ok(Some(Message {
        text: raw.text.clone(),
        timestamp,
    }))
}

/// Drain a channel's stream, keeping admitted messages in arrival order.
///
/// Malformed timestamps are logged and skipped. A stream error ends the
/// channel with that error.
pub async fn collect(
    mut messages: RawMessageStream,
    window: &TimeWindow,
) -> Result<Vec<Message>, ChannelAccessError> {
    let mut kept = Vec::new();
    while let Some(raw) = messages.next().await {
        let raw = raw?;
        match admit(&raw, window) {
            Ok(Some(message)) => kept.push(message),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Skipping message with malformed timestamp"),
        }
    }
    Ok(kept)
}
