//! Message sources: where channel history comes from.

pub mod telegram;

pub use telegram::TelegramSource;

use async_trait::async_trait;

use crate::error::ChannelAccessError;
use crate::pipeline::types::{ChannelFeed, ChannelRef, TimeWindow};

/// A messaging platform session able to read channel history.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Resolve `channel` and open its history.
    ///
    /// `window` is a hint: a source may stop early once it has passed
    /// `window.start`, but callers still filter every message.
    async fn open(
        &self,
        channel: &ChannelRef,
        window: &TimeWindow,
    ) -> Result<ChannelFeed, ChannelAccessError>;

    /// Release the session. Called once at the end of the run.
    async fn close(&self) {}
}
