//! Simulated Chunk Source
//!
//! Emulates a streaming backend on top of a [`ResponseStrategy`]. The reply is
//! generated up front, then released chunk by chunk with simulated latency:
//!
//! - [`Delivery::Words`]: one word per chunk (leading space on all but the
//!   first), each after a random delay in `[min_delay, max_delay]`.
//! - [`Delivery::Whole`]: a single chunk after `whole_delay`.
//!
//! The cancellation token is checked before every chunk and also interrupts
//! the latency wait.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use rand::Rng;
use tokio_util::sync::CancellationToken;

use super::traits::{ChunkSource, ChunkStream, Delivery, ResponseStrategy};
use crate::error::{StreamError, StreamResult};

/// Latency settings for simulated delivery
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkTiming {
    /// Minimum delay before each word chunk
    pub min_delay: Duration,
    /// Maximum delay before each word chunk
    pub max_delay: Duration,
    /// Delay before a whole-reply chunk
    pub whole_delay: Duration,
}

impl Default for ChunkTiming {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(150),
            whole_delay: Duration::from_millis(500),
        }
    }
}

impl ChunkTiming {
    /// No latency at all
    #[must_use]
    pub fn instant() -> Self {
        Self {
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            whole_delay: Duration::ZERO,
        }
    }

    /// Random per-word delay within the configured range
    fn word_delay(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        rand::thread_rng().gen_range(self.min_delay..=self.max_delay)
    }
}

/// Split a reply into word chunks, separated by a single leading space
#[must_use]
pub fn word_chunks(text: &str) -> Vec<String> {
    text.split_whitespace()
        .enumerate()
        .map(|(i, word)| {
            if i == 0 {
                word.to_string()
            } else {
                format!(" {word}")
            }
        })
        .collect()
}

struct Pending {
    chunks: std::vec::IntoIter<String>,
    delivery: Delivery,
    timing: ChunkTiming,
    cancel: CancellationToken,
}

/// [`ChunkSource`] that chunks a [`ResponseStrategy`]'s reply locally
pub struct SimulatedSource<S> {
    strategy: Arc<S>,
    timing: ChunkTiming,
}

impl<S: ResponseStrategy> SimulatedSource<S> {
    /// Wrap a strategy with default latencies
    pub fn new(strategy: S) -> Self {
        Self::with_timing(strategy, ChunkTiming::default())
    }

    /// Wrap a strategy with custom latencies
    pub fn with_timing(strategy: S, timing: ChunkTiming) -> Self {
        Self {
            strategy: Arc::new(strategy),
            timing,
        }
    }

    /// The configured latencies
    #[must_use]
    pub fn timing(&self) -> &ChunkTiming {
        &self.timing
    }
}

#[async_trait]
impl<S: ResponseStrategy + 'static> ChunkSource for SimulatedSource<S> {
    fn name(&self) -> &str {
        self.strategy.name()
    }

    async fn open(&self, input: &str, cancel: CancellationToken) -> StreamResult<ChunkStream> {
        let reply = self.strategy.generate(input)?;
        let chunks = match reply.delivery {
            Delivery::Whole => vec![reply.text],
            Delivery::Words => word_chunks(&reply.text),
        };

        tracing::debug!(
            strategy = self.strategy.name(),
            chunks = chunks.len(),
            delivery = ?reply.delivery,
            "Simulated reply planned"
        );

        let pending = Pending {
            chunks: chunks.into_iter(),
            delivery: reply.delivery,
            timing: self.timing.clone(),
            cancel,
        };

        let stream = stream::unfold(pending, |mut pending| async move {
            let chunk = pending.chunks.next()?;

            if pending.cancel.is_cancelled() {
                pending.chunks = Vec::new().into_iter();
                return Some((Err(StreamError::Canceled), pending));
            }

            let delay = match pending.delivery {
                Delivery::Whole => pending.timing.whole_delay,
                Delivery::Words => pending.timing.word_delay(),
            };

            let canceled = tokio::select! {
                () = pending.cancel.cancelled() => true,
                () = tokio::time::sleep(delay) => false,
            };

            if canceled {
                pending.chunks = Vec::new().into_iter();
                Some((Err(StreamError::Canceled), pending))
            } else {
                Some((Ok(chunk), pending))
            }
        });

        Ok(Box::pin(stream))
    }
}
