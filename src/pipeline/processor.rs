//! Channel processor: fetch, filter, and write each channel in turn.
//!
//! Flow per run:
//! 1. Open the destination spreadsheet (fatal on failure)
//! 2. For each channel: open feed → filter → replace worksheet
//! 3. Close the messaging session
//! 4. Send the completion email (never fatal)
//!
//! Failures scoped to one channel are logged and the next channel runs.

use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::notify::{self, EmailCreds, Mailer};
use crate::pipeline::filter;
use crate::pipeline::types::{ChannelFailure, ChannelRef, ChannelSuccess, RunContext, RunReport};
use crate::sheets::{SheetStore, Spreadsheet, write_channel};
use crate::sources::MessageSource;

/// Everything a run reads before touching any external service.
#[derive(Debug, Clone)]
pub struct RunInputs {
    pub channels: Vec<ChannelRef>,
    pub spreadsheet_name: String,
    pub email_creds: EmailCreds,
}

/// Processes channels one at a time against a single spreadsheet.
pub struct ChannelProcessor<'a> {
    ctx: &'a RunContext,
    source: &'a dyn MessageSource,
    spreadsheet: &'a dyn Spreadsheet,
}

impl<'a> ChannelProcessor<'a> {
    pub fn new(
        ctx: &'a RunContext,
        source: &'a dyn MessageSource,
        spreadsheet: &'a dyn Spreadsheet,
    ) -> Self {
        Self {
            ctx,
            source,
            spreadsheet,
        }
    }

    /// Fetch, filter and write a single channel.
    pub async fn process(&self, channel: &ChannelRef) -> Result<ChannelSuccess> {
        info!(%channel, "Processing channel");

        let feed = self.source.open(channel, &self.ctx.window).await?;
        let messages = filter::collect(feed.messages, &self.ctx.window).await?;
        let rows = write_channel(self.spreadsheet, &feed.title, &messages).await?;

        Ok(ChannelSuccess {
            channel: channel.clone(),
            worksheet: feed.title,
            rows,
        })
    }

    /// Process every channel in order. Failures are logged and recorded,
    /// never returned.
    pub async fn process_all(&self, channels: &[ChannelRef], report: &mut RunReport) {
        for channel in channels {
            match self.process(channel).await {
                Ok(success) => {
                    info!(
                        %channel,
                        worksheet = %success.worksheet,
                        rows = success.rows,
                        "Scraped and saved messages for channel"
                    );
                    report.written.push(success);
                }
                Err(e) => {
                    match &e {
                        Error::Channel(_) => {
                            error!(%channel, error = %e, "Failed to read channel")
                        }
                        Error::Worksheet(_) => {
                            error!(%channel, error = %e, "Failed to write worksheet")
                        }
                        _ => error!(%channel, error = %e, "Failed to scrape channel"),
                    }
                    report.failed.push(ChannelFailure {
                        channel: channel.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }
}

/// Run the whole pipeline once.
///
/// Returns an error only for fatal setup failures (spreadsheet cannot be
/// opened). The source is closed on every path once it has been handed in.
pub async fn run(
    ctx: &RunContext,
    inputs: &RunInputs,
    source: &dyn MessageSource,
    store: &dyn SheetStore,
    mailer: &dyn Mailer,
) -> Result<RunReport> {
    info!(
        channels = inputs.channels.len(),
        window_start = %ctx.window.start,
        window_end = %ctx.window.end,
        "Starting scrape run"
    );

    let spreadsheet = match store.open(&inputs.spreadsheet_name).await {
        Ok(spreadsheet) => spreadsheet,
        Err(e) => {
            source.close().await;
            return Err(e.into());
        }
    };

    let mut report = RunReport::default();
    ChannelProcessor::new(ctx, source, spreadsheet.as_ref())
        .process_all(&inputs.channels, &mut report)
        .await;
    source.close().await;

    report.notified = notify::send_completion(mailer, &inputs.email_creds).await;

    log_report(&report);
    Ok(report)
}

fn log_report(report: &RunReport) {
    if report.failed.is_empty() {
        info!(
            written = report.written.len(),
            notified = report.notified,
            "Scrape run complete"
        );
    } else {
        warn!(
            written = report.written.len(),
            failed = report.failed.len(),
            total = report.total(),
            notified = report.notified,
            "Scrape run complete with failures"
        );
        for failure in &report.failed {
            warn!(channel = %failure.channel, reason = %failure.reason, "Channel skipped");
        }
    }
}
