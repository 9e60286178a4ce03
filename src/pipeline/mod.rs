//! Scrape pipeline.
//!
//! Every channel flows through:
//! 1. `MessageSource::open()`: resolve the channel, stream its history
//! 2. `filter::collect()`: keep text messages inside the time window
//! 3. `sheets::write_channel()`: replace the channel's worksheet
//!
//! After the last channel a completion email is sent.

pub mod filter;
pub mod processor;
pub mod types;

pub use processor::{ChannelProcessor, RunInputs, run};
pub use types::{ChannelRef, Message, RawMessage, RunContext, RunReport, TimeWindow};
