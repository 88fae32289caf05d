//! Transcript Management
//!
//! The ordered sequence of messages shown in the chat panel. The transcript is
//! append-only, except for in-place updates to the single assistant message
//! that is currently streaming.
//!
//! # Invariants
//!
//! - At most one message has `streaming = true` at any time.
//! - Once a message stops streaming it never streams again.
//! - Chunks are only accepted for the streaming message.

use thiserror::Error;

use crate::messages::{Message, MessageId, MessageRole};

/// Errors raised by transcript mutations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranscriptError {
    /// Another assistant message is still streaming
    #[error("message {0} is still streaming")]
    AlreadyStreaming(MessageId),

    /// The message is not the one currently streaming
    #[error("message {0} is not streaming")]
    NotStreaming(MessageId),
}

/// Caller-owned ordered list of chat messages
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    streaming_id: Option<MessageId>,
    /// Maximum number of messages to keep (0 = unlimited)
    max_messages: usize,
}

impl Transcript {
    /// Create an empty transcript with no size limit
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transcript that keeps at most `max_messages` entries
    #[must_use]
    pub fn with_limit(max_messages: usize) -> Self {
        Self {
            max_messages,
            ..Self::default()
        }
    }

    /// Seed the transcript with initial messages
    ///
    /// Seeded messages are always stored as finished, whatever their flag says.
    pub fn seed(&mut self, initial: impl IntoIterator<Item = Message>) {
        for mut msg in initial {
            msg.finish();
            self.messages.push(msg);
        }
        self.prune_if_needed();
    }

    /// Add a user message
    pub fn push_user(&mut self, content: impl Into<String>) -> MessageId {
        let msg = Message::user(content);
        let id = msg.id.clone();
        self.messages.push(msg);
        self.prune_if_needed();
        id
    }

    /// Add an empty assistant message that will receive streamed chunks
    pub fn begin_assistant(&mut self) -> Result<MessageId, TranscriptError> {
        if let Some(current) = &self.streaming_id {
            return Err(TranscriptError::AlreadyStreaming(current.clone()));
        }

        let msg = Message::assistant_placeholder();
        let id = msg.id.clone();
        self.streaming_id = Some(id.clone());
        self.messages.push(msg);
        self.prune_if_needed();
        Ok(id)
    }

    /// Append a chunk to the streaming message
    pub fn append_chunk(&mut self, id: &MessageId, chunk: &str) -> Result<(), TranscriptError> {
        let msg = self.streaming_mut(id)?;
        msg.append(chunk);
        Ok(())
    }

    /// Finish the streaming message normally
    pub fn complete(&mut self, id: &MessageId) -> Result<(), TranscriptError> {
        self.streaming_mut(id)?.finish();
        self.streaming_id = None;
        Ok(())
    }

    /// Stop streaming but keep whatever content was already delivered
    pub fn interrupt(&mut self, id: &MessageId) -> Result<(), TranscriptError> {
        self.complete(id)
    }

    /// Replace the streaming message's content with a fallback and finish it
    pub fn fail(&mut self, id: &MessageId, apology: &str) -> Result<(), TranscriptError> {
        let msg = self.streaming_mut(id)?;
        msg.content.clear();
        msg.content.push_str(apology);
        msg.finish();
        self.streaming_id = None;
        Ok(())
    }

    /// ID of the message currently streaming, if any
    #[must_use]
    pub fn streaming_id(&self) -> Option<&MessageId> {
        self.streaming_id.as_ref()
    }

    /// Get message by ID
    #[must_use]
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// All messages in display order
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript has no messages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Count of messages by role
    #[must_use]
    pub fn count_role(&self, role: MessageRole) -> usize {
        self.messages.iter().filter(|m| m.role == role).count()
    }

    fn streaming_mut(&mut self, id: &MessageId) -> Result<&mut Message, TranscriptError> {
        if self.streaming_id.as_ref() != Some(id) {
            return Err(TranscriptError::NotStreaming(id.clone()));
        }
        self.messages
            .iter_mut()
            .find(|m| &m.id == id)
            .ok_or_else(|| TranscriptError::NotStreaming(id.clone()))
    }

    /// Remove the oldest messages (never the streaming one) beyond the limit
    fn prune_if_needed(&mut self) {
        if self.max_messages == 0 || self.messages.len() <= self.max_messages {
            return;
        }

        let to_remove = self.messages.len() - self.max_messages;
        let mut removed = 0;
        let streaming_id = self.streaming_id.clone();

        self.messages.retain(|msg| {
            if Some(&msg.id) == streaming_id.as_ref() || removed >= to_remove {
                return true;
            }
            removed += 1;
            false
        });

        tracing::debug!(
            removed = removed,
            remaining = self.messages.len(),
            "Pruned transcript messages"
        );
    }
}
