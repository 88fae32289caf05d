//! Response Backend Traits
//!
//! Trait definitions for the two seams the streaming controller depends on:
//!
//! - [`ResponseStrategy`]: turns the user's input into a complete reply
//!   (pure, synchronous). The canned keyword table is one implementation.
//! - [`ChunkSource`]: turns the user's input into a lazily-pulled stream of
//!   text chunks. Simulated sources chunk a strategy's reply; transport-backed
//!   sources forward chunks as they arrive.
//!
//! The controller never knows which transport, if any, sits behind a source.

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::StreamResult;

/// How a reply should be handed to the chunk sink
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Deliver the whole reply as one chunk
    Whole,
    /// Deliver one whitespace-separated word per chunk
    Words,
}

/// A complete reply produced by a [`ResponseStrategy`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    /// The full reply text
    pub text: String,
    /// Chunking mode for this reply
    pub delivery: Delivery,
}

impl Reply {
    /// A reply streamed word by word
    pub fn words(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            delivery: Delivery::Words,
        }
    }

    /// A reply delivered in a single chunk
    pub fn whole(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            delivery: Delivery::Whole,
        }
    }
}

/// Produces the full reply for an input
///
/// Implementations must be pure: same input, same reply, no side effects.
pub trait ResponseStrategy: Send + Sync {
    /// Strategy name for logs
    fn name(&self) -> &str;

    /// Generate the complete reply for `input`
    fn generate(&self, input: &str) -> StreamResult<Reply>;
}

/// Token events from a chunked transport
#[derive(Clone, Debug)]
pub enum StreamingToken {
    /// A chunk of the response
    Token(String),
    /// Response completed successfully
    Complete {
        /// The complete message (may differ from concatenated tokens)
        message: String,
    },
    /// Error occurred during streaming
    Error(String),
}

/// Lazily-pulled stream of reply chunks
///
/// Nothing is produced until the consumer polls, so a consumer that stops
/// polling stops production. Cancellation surfaces as
/// [`StreamError::Canceled`](crate::error::StreamError::Canceled).
pub type ChunkStream = BoxStream<'static, StreamResult<String>>;

/// Source of reply chunks for one outgoing message
#[async_trait]
pub trait ChunkSource: Send + Sync {
    /// Source name for logs
    fn name(&self) -> &str;

    /// Open a chunk stream for `input`
    ///
    /// The stream must observe `cancel` before producing each chunk.
    async fn open(&self, input: &str, cancel: CancellationToken) -> StreamResult<ChunkStream>;
}

/// A transport that pushes [`StreamingToken`]s through a channel
///
/// Dropping the receiver tells the producer to stop at its next send.
#[async_trait]
pub trait TokenTransport: Send + Sync {
    /// Transport name for logs
    fn name(&self) -> &str;

    /// Send `input` and return the receiver for the streamed reply
    async fn send_streaming(&self, input: &str) -> StreamResult<mpsc::Receiver<StreamingToken>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_constructors() {
        assert_eq!(Reply::words("a b").delivery, Delivery::Words);
        assert_eq!(Reply::whole("a b").delivery, Delivery::Whole);
        assert_eq!(Reply::whole("a b").text, "a b");
    }
}
