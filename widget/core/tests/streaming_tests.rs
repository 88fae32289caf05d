//! End-to-end tests for the streaming pipeline
//!
//! These tests drive the controller and the widget through real chunk sources
//! with paused time, so simulated latency costs nothing and ordering is
//! deterministic. Tests cover:
//! - At most one active stream (supersede)
//! - Chunk ordering and reassembly
//! - Cancellation before and during a stream
//! - `LIST` recognition and single-chunk delivery
//! - Channel-backed transports
//! - Config file to widget wiring

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;
use tokio::sync::mpsc;
use tokio_test::{assert_pending, assert_ready};
use tokio_util::sync::CancellationToken;

use chat_widget_core::backend::{default_rules, word_chunks};
use chat_widget_core::{
    extract, load_config_from_path, CannedResponder, ChannelSource, ChatWidget, ChunkSource,
    ChunkTiming, MessageId, ResponseStrategy, SendOutcome, SimulatedSource, StreamController,
    StreamControllerConfig, StreamError, StreamResult, StreamingToken, TokenTransport,
    WidgetConfig, WidgetPosition,
};

fn fixed_timing(ms: u64) -> ChunkTiming {
    ChunkTiming {
        min_delay: Duration::from_millis(ms),
        max_delay: Duration::from_millis(ms),
        whole_delay: Duration::from_millis(ms),
    }
}

fn canned(ms: u64) -> SimulatedSource<CannedResponder> {
    SimulatedSource::with_timing(CannedResponder::new(), fixed_timing(ms))
}

/// Shared log of everything the sinks and callbacks saw
#[derive(Clone, Default)]
struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

// =============================================================================
// At most one active stream
// =============================================================================

/// Starting a second stream cancels the first before the second's first chunk,
/// and the first stream's completion callback never fires.
#[tokio::test(start_paused = true)]
async fn test_second_stream_supersedes_first() {
    let log = EventLog::default();
    let completions = log.clone();
    let controller = StreamController::new(canned(100), StreamControllerConfig::default())
        .on_complete(move |id| completions.push(format!("complete:{id}")));

    let first_id = MessageId::from("first");
    let second_id = MessageId::from("second");

    let (first, second) = tokio::join!(
        controller.start("hello", first_id, |chunk| log.push(format!("first:{chunk}"))),
        async {
            tokio::time::sleep(Duration::from_millis(250)).await;
            controller
                .start("thank you", second_id, |chunk| {
                    log.push(format!("second:{chunk}"));
                })
                .await
        }
    );

    assert!(matches!(first, Err(StreamError::Canceled)));
    assert!(second.is_ok());

    let events = log.events();
    let first_second = events
        .iter()
        .position(|e| e.starts_with("second:"))
        .unwrap();
    assert!(events[first_second..]
        .iter()
        .all(|e| !e.starts_with("first:")));
    assert_eq!(
        events.iter().filter(|e| e.starts_with("first:")).count(),
        2
    );
    assert_eq!(
        events
            .iter()
            .filter(|e| e.starts_with("complete:"))
            .collect::<Vec<_>>(),
        vec!["complete:second"]
    );
    assert!(!controller.is_streaming());
    assert_eq!(controller.stats().streams_canceled, 1);
    assert_eq!(controller.stats().streams_completed, 1);
}

// =============================================================================
// Ordering
// =============================================================================

/// For every canned reply, the delivered chunks reassemble the full text.
#[tokio::test(start_paused = true)]
async fn test_chunks_reassemble_every_canned_reply() {
    let controller = StreamController::new(canned(10), StreamControllerConfig::default());
    let responder = CannedResponder::new();

    let mut inputs: Vec<String> = default_rules()
        .iter()
        .map(|rule| rule.keywords[0].clone())
        .collect();
    inputs.push("something unrelated".to_string());

    for input in inputs {
        let expected = responder.generate(&input).unwrap().text;
        let mut chunks = Vec::new();
        controller
            .start(&input, MessageId::new(), |chunk| chunks.push(chunk.to_string()))
            .await
            .unwrap();

        assert_eq!(chunks, word_chunks(&expected), "chunks for {input:?}");
        assert_eq!(chunks.concat(), expected, "reply for {input:?}");
    }
}

/// Nothing is produced until the consumer polls, and each chunk waits for its
/// latency.
#[tokio::test(start_paused = true)]
async fn test_stream_is_lazy_and_paced() {
    let source = canned(100);
    let mut stream = source
        .open("hello", CancellationToken::new())
        .await
        .unwrap();

    let mut next = tokio_test::task::spawn(stream.next());
    assert_pending!(next.poll());

    tokio::time::advance(Duration::from_millis(150)).await;
    let chunk = assert_ready!(next.poll());
    assert_eq!(chunk.unwrap().unwrap(), "Hello!");
}

// =============================================================================
// Cancellation
// =============================================================================

/// Canceling right after start delivers no more chunks and no completion.
#[tokio::test(start_paused = true)]
async fn test_cancel_immediately_after_start() {
    let completions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&completions);
    let controller = StreamController::new(canned(50), StreamControllerConfig::default())
        .on_complete(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

    let mut delivered = 0;
    let (result, canceled) = tokio::join!(
        controller.start("hello", MessageId::from("m1"), |_| delivered += 1),
        async {
            tokio::task::yield_now().await;
            controller.cancel()
        }
    );

    assert!(matches!(result, Err(StreamError::Canceled)));
    assert_eq!(canceled, Some(MessageId::from("m1")));
    assert_eq!(delivered, 0);
    assert_eq!(completions.load(Ordering::SeqCst), 0);

    // Idle cancel is a no-op
    assert_eq!(controller.cancel(), None);
    assert_eq!(controller.cancel(), None);
}

/// A canceled reply keeps what it already showed and frees the input.
#[tokio::test(start_paused = true)]
async fn test_widget_cancel_mid_stream_then_send_again() {
    let widget = ChatWidget::new(&WidgetConfig::default(), Arc::new(canned(100)));
    widget.open();

    let (outcome, ()) = tokio::join!(widget.send("price"), async {
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(widget.cancel().is_some());
    });

    let id = outcome.message_id().cloned().unwrap();
    assert_eq!(outcome, SendOutcome::Canceled(id.clone()));
    assert_eq!(
        widget.transcript().get(&id).unwrap().content,
        "Our pricing is"
    );
    assert!(!widget.is_loading());

    assert!(matches!(widget.send("thanks").await, SendOutcome::Completed(_)));
    assert_eq!(widget.transcript().len(), 4);
}

// =============================================================================
// LIST command
// =============================================================================

/// `LIST` in any case, with surrounding whitespace, is one chunk of cards.
#[tokio::test(start_paused = true)]
async fn test_list_command_variants() {
    let controller = StreamController::new(canned(500), StreamControllerConfig::default());

    for input in ["LIST", " list ", "List"] {
        let mut chunks = Vec::new();
        controller
            .start(input, MessageId::new(), |chunk| chunks.push(chunk.to_string()))
            .await
            .unwrap();

        assert_eq!(chunks.len(), 1, "chunks for {input:?}");
        let extraction = extract(&chunks[0]);
        assert_eq!(extraction.cards.len(), 3);
        assert!(extraction.text.trim().is_empty());
    }

    for input in ["listing", "my list"] {
        let mut chunks = Vec::new();
        controller
            .start(input, MessageId::new(), |chunk| chunks.push(chunk.to_string()))
            .await
            .unwrap();

        assert!(chunks.len() > 1, "chunks for {input:?}");
        assert!(!extract(&chunks.concat()).has_cards());
    }
}

/// Sending "hello" streams the greeting in several chunks; "LIST" renders cards.
#[tokio::test(start_paused = true)]
async fn test_widget_end_to_end() {
    let widget = ChatWidget::new(&WidgetConfig::default(), Arc::new(canned(20)));
    widget.open();

    let mut chunk_count = 0;
    let outcome = widget.send_with("hello", |_| chunk_count += 1).await;
    let greeting = CannedResponder::new().generate("hello").unwrap().text;

    assert!(matches!(outcome, SendOutcome::Completed(_)));
    assert!(chunk_count > 1);
    assert_eq!(widget.view()[1].text, greeting);

    let mut list_chunks = 0;
    widget.send_with("LIST", |_| list_chunks += 1).await;
    assert_eq!(list_chunks, 1);

    let views = widget.view();
    let cards = &views[3].cards;
    assert_eq!(cards.len(), 3);
    assert!(cards.iter().all(|c| !c.image.is_empty()
        && !c.title.is_empty()
        && !c.description.is_empty()
        && !c.button_label.is_empty()));
}

// =============================================================================
// Channel transport
// =============================================================================

/// Transport that plays a script of tokens from a spawned producer
struct ScriptedTransport {
    tokens: Vec<StreamingToken>,
    gap: Duration,
    sent: Arc<AtomicUsize>,
}

#[async_trait]
impl TokenTransport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send_streaming(&self, _input: &str) -> StreamResult<mpsc::Receiver<StreamingToken>> {
        let (tx, rx) = mpsc::channel(1);
        let tokens = self.tokens.clone();
        let gap = self.gap;
        let sent = Arc::clone(&self.sent);

        tokio::spawn(async move {
            for token in tokens {
                tokio::time::sleep(gap).await;
                if tx.send(token).await.is_err() {
                    return;
                }
                sent.fetch_add(1, Ordering::SeqCst);
            }
        });

        Ok(rx)
    }
}

fn scripted(tokens: Vec<StreamingToken>, sent: &Arc<AtomicUsize>) -> ChannelSource<ScriptedTransport> {
    ChannelSource::new(ScriptedTransport {
        tokens,
        gap: Duration::from_millis(10),
        sent: Arc::clone(sent),
    })
}

#[tokio::test(start_paused = true)]
async fn test_channel_tokens_fill_widget_message() {
    let sent = Arc::new(AtomicUsize::new(0));
    let source = scripted(
        vec![
            StreamingToken::Token("Streamed".into()),
            StreamingToken::Token(" from".into()),
            StreamingToken::Token(" a channel".into()),
            StreamingToken::Complete {
                message: "Streamed from a channel".into(),
            },
        ],
        &sent,
    );
    let widget = ChatWidget::new(&WidgetConfig::default(), Arc::new(source));

    let outcome = widget.send("anything").await;
    let id = outcome.message_id().cloned().unwrap();

    assert_eq!(outcome, SendOutcome::Completed(id.clone()));
    assert_eq!(
        widget.transcript().get(&id).unwrap().content,
        "Streamed from a channel"
    );
}

#[tokio::test(start_paused = true)]
async fn test_channel_error_becomes_apology() {
    let sent = Arc::new(AtomicUsize::new(0));
    let source = scripted(
        vec![
            StreamingToken::Token("Half".into()),
            StreamingToken::Error("model crashed".into()),
        ],
        &sent,
    );
    let config = WidgetConfig::default();
    let widget = ChatWidget::new(&config, Arc::new(source));

    let outcome = widget.send("anything").await;
    let id = outcome.message_id().cloned().unwrap();

    assert_eq!(outcome, SendOutcome::Failed(id.clone()));
    let message = widget.transcript().get(&id).cloned().unwrap();
    assert_eq!(message.content, config.apology);
    assert!(!message.is_streaming());
}

/// Closing the panel stops the producer at its next send.
#[tokio::test(start_paused = true)]
async fn test_close_stops_channel_producer() {
    let sent = Arc::new(AtomicUsize::new(0));
    let tokens = (0..20)
        .map(|i| StreamingToken::Token(format!("t{i} ")))
        .collect();
    let widget = ChatWidget::new(&WidgetConfig::default(), Arc::new(scripted(tokens, &sent)));

    let (outcome, ()) = tokio::join!(widget.send("go"), async {
        tokio::time::sleep(Duration::from_millis(35)).await;
        widget.close();
    });
    assert!(matches!(outcome, SendOutcome::Canceled(_)));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(sent.load(Ordering::SeqCst) < 20);
}

// =============================================================================
// Configuration
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_config_file_drives_widget() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[widget]
title = "Customer Support"
position = "top-left"

[stream]
min_chunk_delay_ms = 1
max_chunk_delay_ms = 1

[[responder.rules]]
keywords = ["refund"]
reply = "Refunds take five days."
"#
    )
    .unwrap();

    let config = load_config_from_path(Some(file.path().to_path_buf())).unwrap();
    config.validate().unwrap();
    let widget = ChatWidget::from_config(&config).unwrap();

    assert_eq!(widget.title(), "Customer Support");
    assert_eq!(widget.position(), WidgetPosition::TopLeft);

    widget.send("Where is my REFUND?").await;
    assert_eq!(widget.view()[1].text, "Refunds take five days.");

    // Built-in rules were replaced
    widget.send("hello").await;
    assert!(widget.view()[3].text.starts_with("Thank you for your message."));
}
