//! Chat Widget Core - Streaming Replies for an Embeddable Chat Widget
//!
//! This crate holds the state and concurrency logic behind a floating chat
//! widget: the transcript, the cancelable streaming pipeline that fills in an
//! assistant reply chunk by chunk, and the extraction of embedded card markup
//! from reply text. It never renders anything; a host (web view, terminal,
//! test harness) drives it and draws whatever [`ChatWidget::view`] returns.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Host                                │
//! │        send() / cancel() / close()        view()             │
//! └──────────────┬─────────────────────────────────▲─────────────┘
//!                │                                 │
//! ┌──────────────┼─────────────────────────────────┼─────────────┐
//! │              ▼          CHAT WIDGET            │             │
//! │  ┌──────────────────┐ chunks ┌────────────┐    │             │
//! │  │ StreamController │ ─────▶ │ Transcript │ ───┤ extract()   │
//! │  └────────┬─────────┘        └────────────┘    │             │
//! │           │ open(input, cancel)                │             │
//! │  ┌────────┴─────────────────────────────────┐  │             │
//! │  │ ChunkSource: Simulated │ Channel │ HTTP  │  │             │
//! │  └──────────────────────────────────────────┘                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`ChatWidget`]: Host-facing coordinator for one widget instance
//! - [`StreamController`]: Single-active-stream lifecycle with cancellation
//! - [`Transcript`]: Ordered messages with at most one streaming entry
//! - [`ChunkSource`]: Where reply chunks come from
//! - [`CardRecord`]: One card parsed out of a reply
//!
//! # Quick Start
//!
//! ```ignore
//! use chat_widget_core::{load_config, ChatWidget, SendOutcome};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let widget = ChatWidget::from_config(&config)?;
//!     widget.open();
//!
//!     let outcome = widget.send_with("hello", |chunk| print!("{chunk}")).await;
//!     assert!(matches!(outcome, SendOutcome::Completed(_)));
//!
//!     for message in widget.view() {
//!         println!("{:?}: {} ({} cards)", message.role, message.text, message.cards.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: Chunk sources and the canned keyword responder
//! - [`config`]: TOML/env configuration
//! - [`controller`]: The stream controller
//! - [`error`]: Streaming error kinds
//! - [`extract`]: Card markup extraction
//! - [`messages`]: Transcript entries
//! - [`transcript`]: The message list
//! - [`widget`]: The widget coordinator
//!
//! # No UI Dependencies
//!
//! This crate depends on no UI framework and spawns no threads or tasks.
//! Streams are pulled lazily by whoever awaits [`ChatWidget::send`].

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod extract;
pub mod messages;
pub mod transcript;
pub mod widget;

// Re-exports for convenience
pub use backend::{
    CannedResponder, ChannelSource, ChunkSource, ChunkStream, ChunkTiming, Delivery, KeywordRule,
    Reply, ResponseStrategy, SimulatedSource, StreamingToken, TokenTransport,
};
#[cfg(feature = "http")]
pub use backend::HttpSource;
pub use controller::{CompletionCallback, StreamController, StreamControllerConfig, StreamStats};
pub use error::{StreamError, StreamResult};
pub use extract::{extract, render_cards, CardRecord, Extraction};
pub use messages::{Message, MessageId, MessageRole};
pub use transcript::{Transcript, TranscriptError};
pub use widget::{default_source, ChatWidget, MessageView, SendOutcome};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ConfigError, ConfigOverrides,
    ConfigSource, WidgetConfig, WidgetPosition, WidgetToml,
};
