//! Error Types
//!
//! Errors surfaced by the streaming pipeline. Cancellation is modelled as an
//! error variant so that `start()` can distinguish "finished" from "aborted",
//! but it is an expected outcome and is never logged as a failure.

use std::time::Duration;

use thiserror::Error;

/// Errors produced while streaming an assistant reply
#[derive(Debug, Error)]
pub enum StreamError {
    /// The stream was superseded by a newer one or explicitly canceled
    #[error("stream was canceled")]
    Canceled,

    /// The stream exceeded the configured timeout
    #[error("stream timed out after {0:?}")]
    TimedOut(Duration),

    /// The response strategy failed or produced unusable data
    #[error("response generation failed: {0}")]
    Generation(String),

    /// The underlying chunk transport failed
    #[error("chunk transport failed: {message}")]
    Transport {
        /// Human-readable description
        message: String,
        /// Underlying cause, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StreamError {
    /// Build a transport error from any error type
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Whether this error is a cancellation (expected, not a failure)
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }
}

/// Result alias for streaming operations
pub type StreamResult<T> = Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canceled_is_distinguishable() {
        assert!(StreamError::Canceled.is_canceled());
        assert!(!StreamError::Generation("boom".into()).is_canceled());
        assert!(!StreamError::TimedOut(Duration::from_secs(1)).is_canceled());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(StreamError::Canceled.to_string(), "stream was canceled");
        assert_eq!(
            StreamError::Generation("empty reply".into()).to_string(),
            "response generation failed: empty reply"
        );

        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = StreamError::transport(io);
        assert_eq!(err.to_string(), "chunk transport failed: pipe closed");
        assert!(std::error::Error::source(&err).is_some());
    }
}
