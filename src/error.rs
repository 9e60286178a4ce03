//! Error types for the channel scraper.

use std::path::PathBuf;

/// Top-level error type for a scrape run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Input error: {0}")]
    Input(#[from] InputReadError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelAccessError),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] SpreadsheetAccessError),

    #[error("Worksheet error: {0}")]
    Worksheet(#[from] WorksheetWriteError),

    #[error("Notification error: {0}")]
    Notification(#[from] NotificationError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Failures reading the channel list or the email credentials workbook.
#[derive(Debug, thiserror::Error)]
pub enum InputReadError {
    #[error("Failed to open workbook {path}: {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("Workbook {path} has no sheets")]
    NoSheets { path: PathBuf },

    #[error("Workbook {path} is missing column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Workbook {path} has no data rows")]
    NoDataRow { path: PathBuf },

    #[error("Workbook {path} has an empty value for '{column}'")]
    EmptyValue { path: PathBuf, column: String },
}

/// A single channel could not be resolved or read.
#[derive(Debug, thiserror::Error)]
pub enum ChannelAccessError {
    #[error("Channel not found: @{0}")]
    NotFound(String),

    #[error("Channel reference not supported (private or invite link): {0}")]
    Unsupported(String),

    #[error("Failed to read channel {channel}: {reason}")]
    Platform { channel: String, reason: String },

    #[error("Messaging session error: {0}")]
    Session(String),
}

/// A raw message carried a value that could not be interpreted.
#[derive(Debug, thiserror::Error)]
pub enum DataFormatError {
    #[error("Message {id} has an out-of-range timestamp: {date}")]
    Timestamp { id: i64, date: i64 },
}

/// The destination spreadsheet could not be reached.
#[derive(Debug, thiserror::Error)]
pub enum SpreadsheetAccessError {
    #[error("Spreadsheet not found: {0}")]
    NotFound(String),

    #[error("Failed to load service account key {path}: {reason}")]
    Credentials { path: PathBuf, reason: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Spreadsheet request failed: {0}")]
    Request(String),
}

/// Operations on one worksheet failed.
#[derive(Debug, thiserror::Error)]
pub enum WorksheetWriteError {
    #[error("Worksheet not found: {0}")]
    NotFound(String),

    #[error("Failed to delete worksheet {title}: {reason}")]
    Delete { title: String, reason: String },

    #[error("Failed to create worksheet {title}: {reason}")]
    Create { title: String, reason: String },

    #[error("Failed to append rows to {title}: {reason}")]
    Append { title: String, reason: String },

    #[error("Failed to read worksheet {title}: {reason}")]
    Read { title: String, reason: String },
}

/// The completion email could not be sent.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Invalid email address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build email: {0}")]
    Build(String),

    #[error("SMTP send failed: {0}")]
    SendFailed(String),
}

/// Result type alias for a scrape run.
pub type Result<T> = std::result::Result<T, Error>;
