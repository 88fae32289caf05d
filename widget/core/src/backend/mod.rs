//! Response Backends
//!
//! Everything that produces reply chunks for the stream controller, behind the
//! [`ChunkSource`] trait.
//!
//! # Available Sources
//!
//! - **Simulated**: chunks a [`ResponseStrategy`] reply locally with fake
//!   latency (the default, paired with [`CannedResponder`])
//! - **Channel**: forwards [`StreamingToken`]s from any [`TokenTransport`]
//! - **HTTP** (feature `http`): forwards a chunked HTTP response body
//!
//! # Usage
//!
//! ```ignore
//! use chat_widget_core::backend::{CannedResponder, SimulatedSource};
//!
//! let source = SimulatedSource::new(CannedResponder::new());
//! let chunks = source.open("hello", CancellationToken::new()).await?;
//! ```

mod canned;
mod channel;
#[cfg(feature = "http")]
mod http;
mod simulated;
mod traits;

pub use canned::{
    default_cards, default_rules, is_list_command, CannedResponder, KeywordRule, LIST_COMMAND,
};
pub use channel::{token_stream, ChannelSource};
#[cfg(feature = "http")]
pub use http::HttpSource;
pub use simulated::{word_chunks, ChunkTiming, SimulatedSource};
pub use traits::{
    ChunkSource, ChunkStream, Delivery, Reply, ResponseStrategy, StreamingToken, TokenTransport,
};
