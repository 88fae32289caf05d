//! Chat Widget
//!
//! The host-facing coordinator for one widget instance. It owns the panel
//! state, the transcript and the stream controller, and wires them together:
//!
//! - `send()` appends the user message and a streaming assistant placeholder,
//!   then feeds chunks from the controller into that placeholder.
//! - Completion, cancellation and failure each leave the placeholder with its
//!   streaming flag cleared. A failed reply is replaced by the apology text.
//! - `view()` turns the transcript into render-ready prose plus cards.
//!
//! All methods take `&self`, so a host can cancel or close while a `send()`
//! future is still pending. Dropping a pending `send()` future has the same
//! effect as `cancel()`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::backend::{ChunkSource, SimulatedSource};
use crate::config::{WidgetConfig, WidgetPosition};
use crate::controller::{StreamController, StreamStats};
use crate::error::StreamResult;
use crate::extract::{extract, CardRecord};
use crate::messages::{Message, MessageId, MessageRole};
use crate::transcript::Transcript;

/// Result of a [`ChatWidget::send`] call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// Input was empty or a reply is still streaming
    Ignored,
    /// The reply streamed to completion
    Completed(MessageId),
    /// The reply was canceled; partial content is kept
    Canceled(MessageId),
    /// The reply failed; content was replaced with the apology text
    Failed(MessageId),
}

impl SendOutcome {
    /// ID of the assistant message, unless the input was ignored
    #[must_use]
    pub fn message_id(&self) -> Option<&MessageId> {
        match self {
            Self::Ignored => None,
            Self::Completed(id) | Self::Canceled(id) | Self::Failed(id) => Some(id),
        }
    }
}

/// Render-ready view of one transcript message
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageView {
    /// Message ID
    pub id: MessageId,
    /// Who sent the message
    pub role: MessageRole,
    /// Prose with any card block removed
    pub text: String,
    /// Cards extracted from the message, in document order
    pub cards: Vec<CardRecord>,
    /// Whether the message is still receiving chunks
    pub streaming: bool,
}

impl MessageView {
    fn from_message(message: &Message) -> Self {
        let (cards, text) = match message.role {
            MessageRole::Assistant => extract(&message.content).into_parts(),
            MessageRole::User | MessageRole::System => (Vec::new(), message.content.clone()),
        };

        Self {
            id: message.id.clone(),
            role: message.role,
            text,
            cards,
            streaming: message.is_streaming(),
        }
    }
}

/// Build the chunk source a configuration asks for
///
/// With an `api_endpoint` and the `http` feature this is an HTTP source;
/// otherwise replies come from the canned responder with simulated latency.
///
/// # Errors
///
/// Returns a transport error if the HTTP client cannot be built.
pub fn default_source(config: &WidgetConfig) -> StreamResult<Arc<dyn ChunkSource>> {
    if let Some(endpoint) = &config.api_endpoint {
        #[cfg(feature = "http")]
        {
            return Ok(Arc::new(crate::backend::HttpSource::new(endpoint.clone())?));
        }
        #[cfg(not(feature = "http"))]
        tracing::warn!(
            endpoint = %endpoint,
            "HTTP support not compiled in, using canned replies"
        );
    }

    Ok(Arc::new(SimulatedSource::with_timing(
        config.responder(),
        config.chunk_timing(),
    )))
}

/// Interrupts the assistant placeholder when a `send` future is dropped early
struct ReplyGuard<'a> {
    transcript: &'a Mutex<Transcript>,
    message_id: MessageId,
    armed: bool,
}

impl Drop for ReplyGuard<'_> {
    fn drop(&mut self) {
        if self.armed && self.transcript.lock().interrupt(&self.message_id).is_ok() {
            tracing::debug!(message_id = %self.message_id, "Reply dropped before completion");
        }
    }
}

/// One embeddable chat widget instance
pub struct ChatWidget {
    title: String,
    subtitle: String,
    position: WidgetPosition,
    apology: String,
    panel_open: AtomicBool,
    transcript: Arc<Mutex<Transcript>>,
    controller: StreamController,
}

impl ChatWidget {
    /// Create a widget over an explicit chunk source
    #[must_use]
    pub fn new(config: &WidgetConfig, source: Arc<dyn ChunkSource>) -> Self {
        let transcript = Arc::new(Mutex::new(Transcript::with_limit(config.max_messages)));

        let completed = Arc::clone(&transcript);
        let controller = StreamController::from_shared(source, config.controller_config())
            .on_complete(move |id| {
                if let Err(e) = completed.lock().complete(id) {
                    tracing::debug!(message_id = %id, error = %e, "Completion after interruption");
                }
            });

        tracing::info!(
            title = %config.title,
            position = %config.position,
            source = controller.source_name(),
            "Chat widget created"
        );

        Self {
            title: config.title.clone(),
            subtitle: config.subtitle.clone(),
            position: config.position,
            apology: config.apology.clone(),
            panel_open: AtomicBool::new(false),
            transcript,
            controller,
        }
    }

    /// Create a widget with the source the configuration asks for
    ///
    /// # Errors
    ///
    /// Returns an error if the configured source cannot be built.
    pub fn from_config(config: &WidgetConfig) -> StreamResult<Self> {
        Ok(Self::new(config, default_source(config)?))
    }

    /// Seed the transcript with initial messages
    #[must_use]
    pub fn with_initial_messages(self, messages: impl IntoIterator<Item = Message>) -> Self {
        self.transcript.lock().seed(messages);
        self
    }

    /// Panel title
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Panel subtitle
    #[must_use]
    pub fn subtitle(&self) -> &str {
        &self.subtitle
    }

    /// Anchor corner
    #[must_use]
    pub fn position(&self) -> WidgetPosition {
        self.position
    }

    /// Whether the panel is open
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.panel_open.load(Ordering::SeqCst)
    }

    /// Open the panel
    pub fn open(&self) {
        if !self.panel_open.swap(true, Ordering::SeqCst) {
            tracing::info!("Chat panel opened");
        }
    }

    /// Close the panel, canceling any reply in flight
    pub fn close(&self) {
        if self.panel_open.swap(false, Ordering::SeqCst) {
            tracing::info!("Chat panel closed");
        }
        self.cancel();
    }

    /// Flip the panel state, returning whether it is now open
    pub fn toggle(&self) -> bool {
        if self.is_open() {
            self.close();
            false
        } else {
            self.open();
            true
        }
    }

    /// Whether an assistant reply is streaming
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.transcript.lock().streaming_id().is_some()
    }

    /// Send a user message and stream the reply into the transcript
    ///
    /// Input is trimmed. Empty input, or input sent while a reply is still
    /// streaming, is ignored.
    pub async fn send(&self, text: &str) -> SendOutcome {
        self.send_with(text, |_| {}).await
    }

    /// Like [`send`](Self::send), also handing each chunk to `observer`
    ///
    /// The observer sees a chunk right after it lands in the transcript.
    pub async fn send_with<F>(&self, text: &str, mut observer: F) -> SendOutcome
    where
        F: FnMut(&str) + Send,
    {
        let input = text.trim();
        if input.is_empty() {
            return SendOutcome::Ignored;
        }

        let message_id = {
            let mut transcript = self.transcript.lock();
            if let Some(current) = transcript.streaming_id() {
                tracing::debug!(streaming = %current, "Input ignored while reply is streaming");
                return SendOutcome::Ignored;
            }
            transcript.push_user(input);
            match transcript.begin_assistant() {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!(error = %e, "Could not start assistant reply");
                    return SendOutcome::Ignored;
                }
            }
        };

        tracing::info!(message_id = %message_id, chars = input.len(), "Message sent");
        let mut guard = ReplyGuard {
            transcript: &self.transcript,
            message_id: message_id.clone(),
            armed: true,
        };

        let sink = Arc::clone(&self.transcript);
        let sink_id = message_id.clone();
        let result = self
            .controller
            .start(input, message_id.clone(), move |chunk| {
                let appended = sink.lock().append_chunk(&sink_id, chunk);
                match appended {
                    Ok(()) => observer(chunk),
                    Err(e) => tracing::debug!(error = %e, "Dropped chunk for finished message"),
                }
            })
            .await;
        guard.armed = false;

        match result {
            Ok(()) => SendOutcome::Completed(message_id),
            Err(e) if e.is_canceled() => {
                self.interrupt(&message_id);
                SendOutcome::Canceled(message_id)
            }
            Err(e) => {
                tracing::warn!(message_id = %message_id, error = %e, "Reply failed");
                if let Err(e) = self.transcript.lock().fail(&message_id, &self.apology) {
                    tracing::debug!(error = %e, "Failed reply was already finished");
                }
                SendOutcome::Failed(message_id)
            }
        }
    }

    /// Cancel the reply in flight, keeping its partial content
    pub fn cancel(&self) -> Option<MessageId> {
        let canceled = self.controller.cancel()?;
        self.interrupt(&canceled);
        tracing::info!(message_id = %canceled, "Reply canceled");
        Some(canceled)
    }

    fn interrupt(&self, id: &MessageId) {
        // Already finished when cancel() got there first
        let _ = self.transcript.lock().interrupt(id);
    }

    /// Snapshot of the transcript
    #[must_use]
    pub fn transcript(&self) -> Transcript {
        self.transcript.lock().clone()
    }

    /// Render-ready views of every message, in order
    #[must_use]
    pub fn view(&self) -> Vec<MessageView> {
        self.transcript
            .lock()
            .messages()
            .iter()
            .map(MessageView::from_message)
            .collect()
    }

    /// Stream statistics
    #[must_use]
    pub fn stats(&self) -> StreamStats {
        self.controller.stats()
    }

    /// Tear the widget down, canceling any reply in flight
    pub fn shutdown(&self) {
        self.panel_open.store(false, Ordering::SeqCst);
        self.cancel();
        tracing::info!("Chat widget shut down");
    }
}
