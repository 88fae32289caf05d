//! Channel-Backed Chunk Source
//!
//! Adapts any [`TokenTransport`] (a producer that pushes [`StreamingToken`]s
//! into an mpsc channel) into a [`ChunkSource`]. Chunks are forwarded exactly
//! as received. Dropping the returned stream drops the receiver, which stops
//! the producer at its next send.

use async_trait::async_trait;
use futures::stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::traits::{ChunkSource, ChunkStream, StreamingToken, TokenTransport};
use crate::error::{StreamError, StreamResult};

struct ChannelState {
    rx: mpsc::Receiver<StreamingToken>,
    cancel: CancellationToken,
    received_any: bool,
    done: bool,
}

/// Turn a token receiver into a [`ChunkStream`]
///
/// - `Token` becomes a chunk.
/// - `Complete` ends the stream.
/// - `Error` yields [`StreamError::Generation`] and ends the stream.
/// - A channel closed after at least one token counts as completion; closed
///   before any token it is a transport failure.
pub fn token_stream(rx: mpsc::Receiver<StreamingToken>, cancel: CancellationToken) -> ChunkStream {
    let state = ChannelState {
        rx,
        cancel,
        received_any: false,
        done: false,
    };

    let stream = stream::unfold(state, |mut state| async move {
        if state.done {
            return None;
        }

        let next = tokio::select! {
            biased;
            () = state.cancel.cancelled() => None,
            token = state.rx.recv() => Some(token),
        };

        let item = match next {
            None => {
                state.done = true;
                Err(StreamError::Canceled)
            }
            Some(Some(StreamingToken::Token(text))) => {
                state.received_any = true;
                Ok(text)
            }
            Some(Some(StreamingToken::Complete { .. })) => return None,
            Some(Some(StreamingToken::Error(error))) => {
                state.done = true;
                Err(StreamError::Generation(error))
            }
            Some(None) if state.received_any => return None,
            Some(None) => {
                state.done = true;
                Err(StreamError::Transport {
                    message: "stream closed before any token arrived".to_string(),
                    source: None,
                })
            }
        };

        Some((item, state))
    });

    Box::pin(stream)
}

/// [`ChunkSource`] over a channel-based transport
pub struct ChannelSource<T> {
    transport: T,
}

impl<T: TokenTransport> ChannelSource<T> {
    /// Wrap a transport
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl<T: TokenTransport> ChunkSource for ChannelSource<T> {
    fn name(&self) -> &str {
        self.transport.name()
    }

    async fn open(&self, input: &str, cancel: CancellationToken) -> StreamResult<ChunkStream> {
        let rx = self.transport.send_streaming(input).await?;
        Ok(token_stream(rx, cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    async fn collect(tokens: Vec<StreamingToken>) -> Vec<StreamResult<String>> {
        let (tx, rx) = mpsc::channel(16);
        for token in tokens {
            tx.send(token).await.unwrap();
        }
        drop(tx);
        token_stream(rx, CancellationToken::new()).collect().await
    }

    #[tokio::test]
    async fn test_tokens_forwarded_until_complete() {
        let items = collect(vec![
            StreamingToken::Token("Hello".into()),
            StreamingToken::Token(" world".into()),
            StreamingToken::Complete {
                message: "Hello world".into(),
            },
            StreamingToken::Token("ignored".into()),
        ])
        .await;

        let chunks: Vec<String> = items.into_iter().map(Result::unwrap).collect();
        assert_eq!(chunks, vec!["Hello", " world"]);
    }

    #[tokio::test]
    async fn test_error_token_is_generation_failure() {
        let items = collect(vec![
            StreamingToken::Token("Partial".into()),
            StreamingToken::Error("backend exploded".into()),
        ])
        .await;

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(&items[1], Err(StreamError::Generation(e)) if e == "backend exploded"));
    }

    #[tokio::test]
    async fn test_closed_channel() {
        let items = collect(vec![StreamingToken::Token("only".into())]).await;
        assert_eq!(items.len(), 1);

        let items = collect(Vec::new()).await;
        assert!(matches!(items.as_slice(), [Err(StreamError::Transport { .. })]));
    }

    #[tokio::test]
    async fn test_cancel_before_next_token() {
        let (tx, rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let mut stream = token_stream(rx, cancel.clone());

        tx.send(StreamingToken::Token("first".into())).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), "first");

        tx.send(StreamingToken::Token("second".into())).await.unwrap();
        cancel.cancel();
        assert!(matches!(stream.next().await, Some(Err(StreamError::Canceled))));
        assert!(stream.next().await.is_none());

        drop(stream);
        assert!(tx.send(StreamingToken::Token("late".into())).await.is_err());
    }
}
