//! Spreadsheet storage: one worksheet per channel.

pub mod auth;
pub mod google;
pub mod writer;

pub use google::{GoogleSheets, GoogleSheetsConfig};
pub use writer::{HEADER_ROW, INITIAL_COLS, INITIAL_ROWS, write_channel};

use async_trait::async_trait;

use crate::error::{SpreadsheetAccessError, WorksheetWriteError};

/// Entry point to a spreadsheet service.
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Open a spreadsheet by its name.
    async fn open(&self, name: &str) -> Result<Box<dyn Spreadsheet>, SpreadsheetAccessError>;
}

/// An open spreadsheet document, addressed by worksheet title.
#[async_trait]
pub trait Spreadsheet: Send + Sync {
    fn name(&self) -> &str;

    /// Delete a worksheet. `WorksheetWriteError::NotFound` if absent.
    async fn delete_worksheet(&self, title: &str) -> Result<(), WorksheetWriteError>;

    /// Create an empty worksheet with the given grid size.
    async fn add_worksheet(
        &self,
        title: &str,
        rows: u32,
        cols: u32,
    ) -> Result<(), WorksheetWriteError>;

    /// Append rows after the last non-empty row.
    async fn append_rows(
        &self,
        title: &str,
        rows: &[Vec<String>],
    ) -> Result<(), WorksheetWriteError>;

    /// Read every non-empty row back.
    async fn read_rows(&self, title: &str) -> Result<Vec<Vec<String>>, WorksheetWriteError>;
}
