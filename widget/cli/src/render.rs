//! Terminal rendering for widget output
//!
//! Prose is wrapped to the terminal width; cards become small boxed blocks.
//! In JSON mode each finished reply is printed as one object per line.

use chat_widget_core::{CardRecord, MessageView, SendOutcome};
use serde_json::json;

/// A line of user input, classified
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Leave the program
    Quit,
    /// Open the panel
    Open,
    /// Close the panel (cancels a reply in flight)
    Close,
    /// Anything else is a message for the widget
    Message(String),
}

impl Command {
    /// Classify one input line
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "/quit" | "/exit" => Self::Quit,
            "/open" => Self::Open,
            "/close" => Self::Close,
            _ => Self::Message(line.to_string()),
        }
    }
}

/// Echoes streamed chunks until markup shows up
///
/// Once a `<` arrives the rest of the reply is held back, and the finished
/// message is rendered properly instead.
#[derive(Debug, Default)]
pub struct LiveEcho {
    echoed: String,
    held: bool,
}

impl LiveEcho {
    /// Text to print for `chunk`, if any
    pub fn push(&mut self, chunk: &str) -> Option<String> {
        if self.held {
            return None;
        }
        let visible = match chunk.find('<') {
            Some(at) => {
                self.held = true;
                &chunk[..at]
            }
            None => chunk,
        };
        if visible.is_empty() {
            return None;
        }
        self.echoed.push_str(visible);
        Some(visible.to_string())
    }

    /// Whether part of the reply was held back
    pub fn held(&self) -> bool {
        self.held
    }

    /// What the finished message still needs printed
    pub fn remainder(&self, view: &MessageView, width: usize) -> String {
        if !self.held {
            return String::new();
        }
        let text = view
            .text
            .strip_prefix(self.echoed.trim_end())
            .unwrap_or(&view.text);
        render_parts(text, &view.cards, width)
    }
}

/// Render a whole message: wrapped prose, then cards
pub fn render_message(view: &MessageView, width: usize) -> String {
    render_parts(&view.text, &view.cards, width)
}

fn render_parts(text: &str, cards: &[CardRecord], width: usize) -> String {
    let mut out = String::new();
    let text = text.trim();
    if !text.is_empty() {
        out.push_str(&textwrap::fill(text, width));
        out.push('\n');
    }
    for card in cards {
        out.push_str(&render_card(card, width));
    }
    out
}

/// Render one card as a boxed block
pub fn render_card(card: &CardRecord, width: usize) -> String {
    let inner = width.saturating_sub(2).max(10);
    let mut out = format!("┌ {}\n", card.title);
    for line in textwrap::wrap(&card.description, inner) {
        out.push_str(&format!("│ {line}\n"));
    }
    if !card.image.is_empty() {
        out.push_str(&format!("│ {}\n", card.image));
    }
    out.push_str(&format!("└ [{}]\n", card.button_label));
    out
}

/// Short name of an outcome
pub fn outcome_label(outcome: &SendOutcome) -> &'static str {
    match outcome {
        SendOutcome::Ignored => "ignored",
        SendOutcome::Completed(_) => "completed",
        SendOutcome::Canceled(_) => "canceled",
        SendOutcome::Failed(_) => "failed",
    }
}

/// One JSON line describing a finished reply
pub fn outcome_json(outcome: &SendOutcome, view: Option<&MessageView>) -> serde_json::Value {
    json!({
        "outcome": outcome_label(outcome),
        "message": view,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_widget_core::{MessageId, MessageRole};
    use pretty_assertions::assert_eq;

    fn view(text: &str, cards: Vec<CardRecord>) -> MessageView {
        MessageView {
            id: MessageId::from("m1"),
            role: MessageRole::Assistant,
            text: text.to_string(),
            cards,
            streaming: false,
        }
    }

    #[test]
    fn test_command_parsing() {
        assert_eq!(Command::parse(" /quit "), Command::Quit);
        assert_eq!(Command::parse("/exit"), Command::Quit);
        assert_eq!(Command::parse("/open"), Command::Open);
        assert_eq!(Command::parse("/close"), Command::Close);
        assert_eq!(
            Command::parse("hello /close"),
            Command::Message("hello /close".to_string())
        );
    }

    #[test]
    fn test_live_echo_holds_markup() {
        let mut echo = LiveEcho::default();
        assert_eq!(echo.push("Here"), Some("Here".to_string()));
        assert_eq!(echo.push(" you go: <list-cards>"), Some(" you go: ".to_string()));
        assert_eq!(echo.push("<card>"), None);
        assert!(echo.held());

        let card = CardRecord::new("img", "Title", "Desc", "Go");
        let finished = view("Here you go:", vec![card]);
        assert_eq!(echo.remainder(&finished, 40), "┌ Title\n│ Desc\n│ img\n└ [Go]\n");
    }

    #[test]
    fn test_live_echo_plain_reply_needs_no_remainder() {
        let mut echo = LiveEcho::default();
        echo.push("Hello");
        echo.push(" there");
        assert_eq!(echo.remainder(&view("Hello there", Vec::new()), 40), "");
    }

    #[test]
    fn test_render_message_wraps_prose() {
        let rendered = render_message(&view("one two three four", Vec::new()), 9);
        assert_eq!(rendered, "one two\nthree\nfour\n");
    }

    #[test]
    fn test_outcome_json() {
        let finished = view("Hi", Vec::new());
        let value = outcome_json(&SendOutcome::Completed(finished.id.clone()), Some(&finished));
        assert_eq!(value["outcome"], "completed");
        assert_eq!(value["message"]["text"], "Hi");
        assert_eq!(value["message"]["role"], "assistant");

        let value = outcome_json(&SendOutcome::Ignored, None);
        assert!(value["message"].is_null());
    }
}
