//! HTTP Chunk Source
//!
//! Forwards a chunked HTTP response body to the widget. The request is a JSON
//! POST of `{"message": "<input>"}` to the configured endpoint; every body
//! frame that arrives becomes one chunk. Multi-byte characters split across
//! frames are carried over to the next chunk.

use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use tokio_util::sync::CancellationToken;

use super::traits::{ChunkSource, ChunkStream};
use crate::error::{StreamError, StreamResult};

/// Chunk source backed by a streaming HTTP endpoint
#[derive(Clone)]
pub struct HttpSource {
    endpoint: String,
    http_client: reqwest::Client,
}

impl HttpSource {
    /// Create a source for `endpoint`
    pub fn new(endpoint: impl Into<String>) -> StreamResult<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(StreamError::transport)?;

        Ok(Self {
            endpoint: endpoint.into(),
            http_client,
        })
    }

    /// The endpoint URL
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Split off the longest valid UTF-8 prefix, keeping an incomplete tail
fn take_utf8(carry: &mut Vec<u8>) -> StreamResult<String> {
    let valid = match std::str::from_utf8(carry) {
        Ok(_) => carry.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(e) => {
            return Err(StreamError::Generation(format!(
                "invalid UTF-8 in response: {e}"
            )))
        }
    };

    let tail = carry.split_off(valid);
    String::from_utf8(std::mem::replace(carry, tail))
        .map_err(|e| StreamError::Generation(e.to_string()))
}

#[async_trait]
impl ChunkSource for HttpSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn open(&self, input: &str, cancel: CancellationToken) -> StreamResult<ChunkStream> {
        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "message": input }))
            .send()
            .await
            .map_err(StreamError::transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StreamError::Generation(format!(
                "endpoint returned {status}: {body}"
            )));
        }

        let body = response.bytes_stream().boxed();
        let state = (body, Vec::<u8>::new(), cancel, false);

        let chunks = stream::unfold(state, |(mut body, mut carry, cancel, done)| async move {
            if done {
                return None;
            }
            loop {
                let next = tokio::select! {
                    biased;
                    () = cancel.cancelled() => None,
                    frame = body.next() => Some(frame),
                };

                let item = match next {
                    None => Err(StreamError::Canceled),
                    Some(Some(Ok(bytes))) => {
                        carry.extend_from_slice(&bytes);
                        match take_utf8(&mut carry) {
                            Ok(text) if text.is_empty() => continue,
                            Ok(text) => return Some((Ok(text), (body, carry, cancel, false))),
                            Err(e) => Err(e),
                        }
                    }
                    Some(Some(Err(e))) => Err(StreamError::transport(e)),
                    Some(None) if carry.is_empty() => return None,
                    Some(None) => Err(StreamError::Generation(
                        "response ended inside a UTF-8 sequence".to_string(),
                    )),
                };
                return Some((item, (body, carry, cancel, true)));
            }
        });

        Ok(Box::pin(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_utf8_carries_partial_code_point() {
        let bytes = "→x".as_bytes();
        let mut carry = bytes[..2].to_vec();
        assert_eq!(take_utf8(&mut carry).unwrap(), "");
        assert_eq!(carry.len(), 2);

        carry.extend_from_slice(&bytes[2..]);
        assert_eq!(take_utf8(&mut carry).unwrap(), "→x");
        assert!(carry.is_empty());
    }

    #[test]
    fn test_take_utf8_rejects_invalid_bytes() {
        let mut carry = vec![b'a', 0xff, b'b'];
        assert!(matches!(
            take_utf8(&mut carry),
            Err(StreamError::Generation(_))
        ));
    }
}
