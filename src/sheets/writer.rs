//! Worksheet writer: replaces a channel's tab with fresh rows.

use tracing::{debug, info, warn};

use crate::error::WorksheetWriteError;
use crate::pipeline::types::Message;
use crate::sheets::Spreadsheet;

/// First row of every channel worksheet.
pub const HEADER_ROW: [&str; 2] = ["Message", "Timestamp"];

/// Grid size of a freshly created worksheet.
pub const INITIAL_ROWS: u32 = 1000;
pub const INITIAL_COLS: u32 = 2;

/// Replace the worksheet `title` with a header row plus one row per message.
///
/// An existing worksheet is deleted first; a missing one is fine, and any
/// other delete failure is logged before trying to create anyway. Returns
/// the number of message rows written.
pub async fn write_channel(
    spreadsheet: &dyn Spreadsheet,
    title: &str,
    messages: &[Message],
) -> Result<usize, WorksheetWriteError> {
    match spreadsheet.delete_worksheet(title).await {
        Ok(()) => debug!(worksheet = %title, "Deleted previous worksheet"),
        Err(WorksheetWriteError::NotFound(_)) => {}
        Err(e) => warn!(worksheet = %title, error = %e, "Could not delete previous worksheet"),
    }

    spreadsheet
        .add_worksheet(title, INITIAL_ROWS, INITIAL_COLS)
        .await?;

    let mut rows = Vec::with_capacity(messages.len() + 1);
    rows.push(HEADER_ROW.iter().map(|s| s.to_string()).collect());
    rows.extend(messages.iter().map(Message::to_row));

    spreadsheet.append_rows(title, &rows).await?;

    info!(
        spreadsheet = %spreadsheet.name(),
        worksheet = %title,
        rows = messages.len(),
        "Worksheet written"
    );
    Ok(messages.len())
}
