//! Structured Content Extraction
//!
//! Assistant replies may embed a list of cards using a small tag vocabulary:
//!
//! ```text
//! Here are some topics:
//! <list-cards>
//!   <card>
//!     <image>https://example.com/a.png</image>
//!     <title>Web Development</title>
//!     <description>Build responsive sites.</description>
//!     <button>Learn More</button>
//!   </card>
//! </list-cards>
//! ```
//!
//! [`extract`] separates the cards from the surrounding prose. It is a pure
//! function over the accumulated message text and it never fails. Only the
//! first container block is honoured, so for text holding a single block,
//! running it again on its own output finds nothing further.

use serde::{Deserialize, Serialize};

/// Container tag name wrapping the card list
pub const CONTAINER_TAG: &str = "list-cards";
/// Item tag name for a single card
pub const ITEM_TAG: &str = "card";
/// Field tag holding the image URL
pub const IMAGE_TAG: &str = "image";
/// Field tag holding the card title
pub const TITLE_TAG: &str = "title";
/// Field tag holding the card description
pub const DESCRIPTION_TAG: &str = "description";
/// Field tag holding the call-to-action label
pub const BUTTON_TAG: &str = "button";

/// One card parsed out of a structured block
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardRecord {
    /// Image URL
    pub image: String,
    /// Card title
    pub title: String,
    /// Short description
    pub description: String,
    /// Call-to-action button label
    pub button_label: String,
}

impl CardRecord {
    /// Create a card with all four fields
    pub fn new(
        image: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        button_label: impl Into<String>,
    ) -> Self {
        Self {
            image: image.into(),
            title: title.into(),
            description: description.into(),
            button_label: button_label.into(),
        }
    }
}

/// Result of running [`extract`] over a message
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Extraction {
    /// Cards found in the first container block (empty if none)
    pub cards: Vec<CardRecord>,
    /// Text to display alongside the cards
    ///
    /// With cards present this is the input minus the container block;
    /// otherwise it is the input unchanged.
    pub text: String,
}

impl Extraction {
    /// Whether structured content was found
    #[must_use]
    pub fn has_cards(&self) -> bool {
        !self.cards.is_empty()
    }

    /// Split into cards and display text
    #[must_use]
    pub fn into_parts(self) -> (Vec<CardRecord>, String) {
        (self.cards, self.text)
    }
}

/// Span of a tagged element inside a haystack
struct Element<'a> {
    /// Byte offset of the opening `<`
    start: usize,
    /// Byte offset just past the closing `>`
    end: usize,
    /// Text between the open and close tags
    inner: &'a str,
}

/// Find the first `<tag>...</tag>` at or after `from` (non-greedy)
fn find_element<'a>(haystack: &'a str, tag: &str, from: usize) -> Option<Element<'a>> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");

    let start = from + haystack.get(from..)?.find(&open)?;
    let inner_start = start + open.len();
    let inner_len = haystack[inner_start..].find(&close)?;
    let inner_end = inner_start + inner_len;

    Some(Element {
        start,
        end: inner_end + close.len(),
        inner: &haystack[inner_start..inner_end],
    })
}

/// Text of a field tag inside a card, or `""` if missing
fn field(card: &str, tag: &str) -> String {
    find_element(card, tag, 0)
        .map(|el| el.inner.trim().to_string())
        .unwrap_or_default()
}

/// Parse every `<card>` inside a container body, in document order
fn parse_cards(body: &str) -> Vec<CardRecord> {
    let mut cards = Vec::new();
    let mut cursor = 0;

    while let Some(item) = find_element(body, ITEM_TAG, cursor) {
        cards.push(CardRecord {
            image: field(item.inner, IMAGE_TAG),
            title: field(item.inner, TITLE_TAG),
            description: field(item.inner, DESCRIPTION_TAG),
            button_label: field(item.inner, BUTTON_TAG),
        });
        cursor = item.end;
    }

    cards
}

/// Separate a card list from the surrounding prose
///
/// Returns no cards (and the text unchanged) when the container tag is absent,
/// unterminated, or holds no well-formed `<card>` elements.
#[must_use]
pub fn extract(text: &str) -> Extraction {
    let Some(block) = find_element(text, CONTAINER_TAG, 0) else {
        return Extraction {
            cards: Vec::new(),
            text: text.to_string(),
        };
    };

    let cards = parse_cards(block.inner);
    if cards.is_empty() {
        return Extraction {
            cards,
            text: text.to_string(),
        };
    }

    let mut remainder = String::with_capacity(text.len() - (block.end - block.start));
    remainder.push_str(&text[..block.start]);
    remainder.push_str(&text[block.end..]);

    Extraction {
        cards,
        text: remainder,
    }
}

/// Render cards back into the tag vocabulary understood by [`extract`]
#[must_use]
pub fn render_cards(cards: &[CardRecord]) -> String {
    let mut out = format!("<{CONTAINER_TAG}>\n");
    for card in cards {
        out.push_str(&format!("  <{ITEM_TAG}>\n"));
        for (tag, value) in [
            (IMAGE_TAG, &card.image),
            (TITLE_TAG, &card.title),
            (DESCRIPTION_TAG, &card.description),
            (BUTTON_TAG, &card.button_label),
        ] {
            out.push_str(&format!("    <{tag}>{value}</{tag}>\n"));
        }
        out.push_str(&format!("  </{ITEM_TAG}>\n"));
    }
    out.push_str(&format!("</{CONTAINER_TAG}>"));
    out
}
