//! Chat Widget CLI - Terminal Host for the Chat Widget Core
//!
//! Drives one widget instance from the terminal: every stdin line is sent as
//! a user message and the assistant reply is streamed to stdout as it arrives.
//!
//! # Usage
//!
//! ```bash
//! # Canned replies with simulated latency
//! chat-widget
//!
//! # No latency, JSON output (one object per reply)
//! chat-widget --instant --json
//!
//! # Real streaming backend (requires the `http` feature)
//! chat-widget --api-endpoint http://localhost:8080/chat
//!
//! # Verbose logging
//! RUST_LOG=debug chat-widget
//! ```
//!
//! # Commands
//!
//! - `/open`, `/close`: panel state (closing cancels a reply in flight)
//! - `/quit`: exit
//! - `LIST`: card demo
//!
//! Ctrl-C cancels the reply in flight, or exits when idle.

mod render;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chat_widget_core::{
    load_config, load_config_from_path, ChatWidget, ConfigOverrides, MessageView, SendOutcome,
    WidgetPosition,
};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use render::{outcome_json, outcome_label, render_message, Command, LiveEcho};

/// Chat Widget - stream assistant replies in the terminal
#[derive(Parser, Debug)]
#[command(name = "chat-widget")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "CHAT_WIDGET_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Panel title
    #[arg(long, value_name = "TEXT")]
    title: Option<String>,

    /// Anchor corner (bottom-right, bottom-left, top-right, top-left)
    #[arg(long, value_name = "CORNER")]
    position: Option<WidgetPosition>,

    /// Streaming HTTP endpoint for replies
    #[arg(long, value_name = "URL")]
    api_endpoint: Option<String>,

    /// Stream timeout in milliseconds (0 = none)
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Disable simulated latency
    #[arg(long)]
    instant: bool,

    /// Print each finished reply as a JSON line
    #[arg(long)]
    json: bool,

    /// Wrap width for prose and cards
    #[arg(short = 'w', long, default_value_t = 80)]
    width: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "CHAT_WIDGET_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new().with_instant(self.instant);
        if let Some(ref title) = self.title {
            overrides = overrides.with_title(title.clone());
        }
        if let Some(position) = self.position {
            overrides = overrides.with_position(position);
        }
        if let Some(ref endpoint) = self.api_endpoint {
            overrides = overrides.with_api_endpoint(endpoint.clone());
        }
        if let Some(ms) = self.timeout_ms {
            overrides = overrides.with_timeout_ms(ms);
        }
        overrides
    }
}

/// Initialize logging with the specified level
///
/// Logs go to stderr so stdout carries only the conversation.
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "chat_widget_cli={level},chat_widget_core={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn flush_stdout() {
    // Nothing useful to do if the terminal went away
    let _ = std::io::stdout().flush();
}

fn assistant_view(widget: &ChatWidget, outcome: &SendOutcome) -> Option<MessageView> {
    let id = outcome.message_id()?;
    widget.view().into_iter().find(|view| &view.id == id)
}

/// Send one message, streaming the reply until it ends or Ctrl-C
async fn converse(widget: &ChatWidget, text: &str, args: &Args) -> Result<()> {
    let mut echo = LiveEcho::default();
    let json = args.json;

    let outcome = tokio::select! {
        outcome = widget.send_with(text, |chunk| {
            if json {
                return;
            }
            if let Some(visible) = echo.push(chunk) {
                print!("{visible}");
                flush_stdout();
            }
        }) => outcome,
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            widget.cancel().map_or(SendOutcome::Ignored, SendOutcome::Canceled)
        }
    };

    let view = assistant_view(widget, &outcome);

    if json {
        println!("{}", outcome_json(&outcome, view.as_ref()));
        return Ok(());
    }

    match (&outcome, view) {
        (SendOutcome::Ignored, _) => {}
        (SendOutcome::Failed(_), Some(view)) => {
            println!("{}", render_message(&view, args.width).trim_end());
        }
        (_, Some(view)) => {
            if echo.held() {
                println!();
                print!("{}", echo.remainder(&view, args.width));
            } else {
                println!();
            }
            if matches!(outcome, SendOutcome::Canceled(_)) {
                println!("[{}]", outcome_label(&outcome));
            }
        }
        (_, None) => {}
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut config = match args.config {
        Some(ref path) => load_config_from_path(Some(path.clone())),
        None => load_config(),
    }
    .context("Failed to load configuration")?;
    args.overrides().apply(&mut config);
    config.validate().context("Invalid configuration")?;

    info!(source = %config.source(), "Configuration loaded");

    let widget = ChatWidget::from_config(&config).context("Failed to create chat widget")?;
    widget.open();

    if !args.json {
        println!("{} - {}", widget.title(), widget.subtitle());
        println!("Type a message, LIST for cards, /quit to exit.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                None
            }
        };
        let Some(line) = line else { break };

        match Command::parse(&line) {
            Command::Quit => break,
            Command::Open => {
                widget.open();
                if !args.json {
                    println!("[open]");
                }
            }
            Command::Close => {
                widget.close();
                if !args.json {
                    println!("[closed]");
                }
            }
            Command::Message(text) => {
                if !widget.is_open() {
                    eprintln!("Panel is closed, type /open first");
                    continue;
                }
                converse(&widget, &text, &args).await?;
            }
        }
    }

    widget.shutdown();
    Ok(())
}
