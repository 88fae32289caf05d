//! Stream Controller
//!
//! Owns the lifecycle of the single in-flight assistant reply of a widget.
//!
//! ```text
//!   start(input, id, sink)
//!        │  cancel previous session (supersede)
//!        ▼
//!   ┌──────────┐  chunk   ┌──────────┐
//!   │ source   │ ───────▶ │  sink    │   (token checked before every chunk)
//!   └──────────┘          └──────────┘
//!        │
//!        ├─ end of stream ──▶ Ok(())  + completion callback (once)
//!        ├─ cancel()/start ─▶ Err(Canceled)
//!        ├─ timeout ────────▶ Err(TimedOut)
//!        └─ source error ───▶ Err(Generation | Transport)
//! ```
//!
//! At most one session is active at a time. The session slot lives behind a
//! mutex, so the invariant also holds on a multi-threaded runtime. Chunks that
//! reached the sink before a cancellation are never retracted.
//! Dropping a `start` future before it resolves counts as a cancellation and
//! frees the slot.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::backend::ChunkSource;
use crate::error::{StreamError, StreamResult};
use crate::messages::MessageId;

/// Configuration for the stream controller
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamControllerConfig {
    /// Abort a stream that runs longer than this (None = no limit)
    pub stream_timeout: Option<Duration>,
}

/// Lifetime statistics for a controller
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Streams started
    pub streams_started: u64,
    /// Streams that ran to completion
    pub streams_completed: u64,
    /// Streams canceled or superseded
    pub streams_canceled: u64,
    /// Streams that failed or timed out
    pub streams_failed: u64,
    /// Chunks handed to sinks
    pub chunks_delivered: u64,
}

/// Callback fired once per completed (non-canceled) stream
pub type CompletionCallback = Arc<dyn Fn(&MessageId) + Send + Sync>;

/// The one outstanding streaming operation
struct ActiveSession {
    message_id: MessageId,
    cancel: CancellationToken,
    generation: u64,
}

#[derive(Default)]
struct ControllerState {
    active: Option<ActiveSession>,
    next_generation: u64,
    stats: StreamStats,
}

/// Releases the session slot when a `start` future is dropped before it resolves
struct SessionGuard<'a> {
    state: &'a Mutex<ControllerState>,
    cancel: CancellationToken,
    generation: u64,
    armed: bool,
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.cancel.cancel();

        let mut state = self.state.lock();
        if state
            .active
            .as_ref()
            .is_some_and(|session| session.generation == self.generation)
        {
            state.active = None;
        }
        state.stats.streams_canceled += 1;
        tracing::debug!(generation = self.generation, "Stream dropped before completion");
    }
}

/// Manages the request → incremental-response lifecycle for one widget
pub struct StreamController {
    source: Arc<dyn ChunkSource>,
    config: StreamControllerConfig,
    state: Mutex<ControllerState>,
    on_complete: Option<CompletionCallback>,
}

impl StreamController {
    /// Create a controller over a chunk source
    pub fn new(source: impl ChunkSource + 'static, config: StreamControllerConfig) -> Self {
        Self::from_shared(Arc::new(source), config)
    }

    /// Create a controller over a shared chunk source
    #[must_use]
    pub fn from_shared(source: Arc<dyn ChunkSource>, config: StreamControllerConfig) -> Self {
        Self {
            source,
            config,
            state: Mutex::new(ControllerState::default()),
            on_complete: None,
        }
    }

    /// Register the completion callback
    #[must_use]
    pub fn on_complete(mut self, callback: impl Fn(&MessageId) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(callback));
        self
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &StreamControllerConfig {
        &self.config
    }

    /// Name of the underlying chunk source
    #[must_use]
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Whether a stream is active
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.state.lock().active.is_some()
    }

    /// Message ID bound to the active stream, if any
    #[must_use]
    pub fn current_streaming_id(&self) -> Option<MessageId> {
        self.state
            .lock()
            .active
            .as_ref()
            .map(|session| session.message_id.clone())
    }

    /// Lifetime statistics
    #[must_use]
    pub fn stats(&self) -> StreamStats {
        self.state.lock().stats.clone()
    }

    /// Cancel the active stream
    ///
    /// Idempotent: returns `None` and does nothing when idle. Otherwise returns
    /// the ID of the message whose stream was canceled.
    pub fn cancel(&self) -> Option<MessageId> {
        let session = self.state.lock().active.take()?;
        session.cancel.cancel();
        tracing::debug!(message_id = %session.message_id, "Stream canceled");
        Some(session.message_id)
    }

    /// Stream the reply for `input`, feeding each chunk to `on_chunk`
    ///
    /// Any active stream is canceled first. Resolves `Ok(())` after the last
    /// chunk (and after the completion callback has fired), or
    /// `Err(StreamError::Canceled)` if this stream was canceled or superseded.
    pub async fn start<F>(
        &self,
        input: &str,
        message_id: MessageId,
        mut on_chunk: F,
    ) -> StreamResult<()>
    where
        F: FnMut(&str) + Send,
    {
        let (cancel, generation) = self.begin(message_id.clone());
        let mut guard = SessionGuard {
            state: &self.state,
            cancel: cancel.clone(),
            generation,
            armed: true,
        };
        let started = Instant::now();

        let run = self.run(input, &cancel, &mut on_chunk);
        let result = match self.config.stream_timeout {
            Some(limit) => match tokio::time::timeout(limit, run).await {
                Ok(result) => result,
                Err(_) => {
                    cancel.cancel();
                    Err(StreamError::TimedOut(limit))
                }
            },
            None => run.await,
        };

        guard.armed = false;
        self.end(generation, &result);

        match &result {
            Ok(chunks) => {
                tracing::debug!(
                    message_id = %message_id,
                    chunks = chunks,
                    elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "Stream complete"
                );
                if let Some(callback) = &self.on_complete {
                    callback(&message_id);
                }
            }
            Err(StreamError::Canceled) => {
                tracing::debug!(message_id = %message_id, "Stream ended by cancellation");
            }
            Err(e) => {
                tracing::warn!(message_id = %message_id, error = %e, "Stream failed");
            }
        }

        result.map(|_| ())
    }

    /// Install a fresh session, superseding any active one
    fn begin(&self, message_id: MessageId) -> (CancellationToken, u64) {
        let cancel = CancellationToken::new();
        let mut state = self.state.lock();

        if let Some(previous) = state.active.take() {
            previous.cancel.cancel();
            tracing::debug!(
                superseded = %previous.message_id,
                message_id = %message_id,
                "Superseding active stream"
            );
        }

        state.next_generation += 1;
        let generation = state.next_generation;
        state.active = Some(ActiveSession {
            message_id,
            cancel: cancel.clone(),
            generation,
        });
        state.stats.streams_started += 1;

        (cancel, generation)
    }

    /// Clear the session slot (if still ours) and record the outcome
    fn end(&self, generation: u64, result: &StreamResult<u64>) {
        let mut state = self.state.lock();

        if state
            .active
            .as_ref()
            .is_some_and(|session| session.generation == generation)
        {
            state.active = None;
        }

        match result {
            Ok(_) => state.stats.streams_completed += 1,
            Err(StreamError::Canceled) => state.stats.streams_canceled += 1,
            Err(_) => state.stats.streams_failed += 1,
        }
    }

    /// Pull chunks from the source until it ends, fails, or is canceled
    async fn run<F>(
        &self,
        input: &str,
        cancel: &CancellationToken,
        on_chunk: &mut F,
    ) -> StreamResult<u64>
    where
        F: FnMut(&str) + Send,
    {
        let mut stream = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(StreamError::Canceled),
            opened = self.source.open(input, cancel.clone()) => opened?,
        };

        let mut delivered = 0u64;
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(StreamError::Canceled),
                next = stream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    if cancel.is_cancelled() {
                        return Err(StreamError::Canceled);
                    }
                    on_chunk(&chunk);
                    delivered += 1;
                    self.state.lock().stats.chunks_delivered += 1;
                }
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }

        if cancel.is_cancelled() {
            return Err(StreamError::Canceled);
        }
        Ok(delivered)
    }
}
