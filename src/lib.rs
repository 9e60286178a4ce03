//! Channel scraper: copies recent Telegram channel messages into Google Sheets.

pub mod config;
pub mod error;
pub mod input;
pub mod notify;
pub mod pipeline;
pub mod sheets;
pub mod sources;
