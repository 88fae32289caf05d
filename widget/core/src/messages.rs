//! Widget Messages
//!
//! The entries that make up a chat transcript. Each message is owned by the
//! host's [`Transcript`](crate::transcript::Transcript); the streaming core only
//! ever appends to an assistant message through the chunk sink.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Who sent a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User input
    User,
    /// Assistant reply
    Assistant,
    /// System notice (seeded by the host, never streamed)
    System,
}

/// A single transcript entry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: MessageId,
    /// Who sent this message
    pub role: MessageRole,
    /// Accumulated content
    pub content: String,
    /// Whether the message is still being streamed
    streaming: bool,
    /// When the message was created
    pub created_at: DateTime<Utc>,
}

impl Message {
    fn with_role(role: MessageRole, content: impl Into<String>, streaming: bool) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content: content.into(),
            streaming,
            created_at: Utc::now(),
        }
    }

    /// Create a complete user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, content, false)
    }

    /// Create a complete assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, content, false)
    }

    /// Create an empty assistant message that will receive streamed chunks
    #[must_use]
    pub fn assistant_placeholder() -> Self {
        Self::with_role(MessageRole::Assistant, String::new(), true)
    }

    /// Create a system notice
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::System, content, false)
    }

    /// Whether the message is still receiving chunks
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Append a streamed chunk
    pub fn append(&mut self, chunk: &str) {
        self.content.push_str(chunk);
    }

    /// Mark streaming as finished. Terminal: there is no way back.
    pub fn finish(&mut self) {
        self.streaming = false;
    }
}
