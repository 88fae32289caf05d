//! Canned Keyword Responder
//!
//! A local [`ResponseStrategy`] that answers from a fixed table: the first rule
//! whose keyword occurs anywhere in the lowercased input wins, otherwise a
//! generic fallback is used. The reserved `LIST` command (whole input, case
//! insensitive, surrounding whitespace ignored) returns the card demo as a
//! single-chunk reply.

use serde::{Deserialize, Serialize};

use super::traits::{Reply, ResponseStrategy};
use crate::error::{StreamError, StreamResult};
use crate::extract::{render_cards, CardRecord};

/// Reserved command that triggers the card demo
pub const LIST_COMMAND: &str = "LIST";

const GREETING: &str = "Hello! How can I assist you today? I'm here to help with any questions you might have about our products or services.";
const HELP: &str = "I'd be happy to help! Could you please provide more details about what you need assistance with? Our support team is available 24/7 to address your concerns.";
const PRODUCTS: &str = "We offer a range of premium products and services designed to meet your needs. Our most popular options include our Pro subscription, Enterprise solutions, and custom integrations. Would you like more specific information about any of these?";
const PRICING: &str = "Our pricing is flexible and tailored to your specific needs. Basic plans start at $19/month, while our Pro plans, which include additional features and support, start at $49/month. We also offer custom Enterprise pricing for larger organizations.";
const THANKS: &str = "You're very welcome! If you have any other questions in the future, don't hesitate to reach out. We're always here to help.";
const FALLBACK: &str = "Thank you for your message. I understand you're interested in learning more. To better assist you, could you provide additional details about your specific needs or questions? I'm here to help and will do my best to provide the information you're looking for.";

/// Whether `input` is exactly the reserved `LIST` command
#[must_use]
pub fn is_list_command(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case(LIST_COMMAND)
}

/// One row of the keyword table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    /// Lowercase keywords; any substring match selects this rule
    pub keywords: Vec<String>,
    /// Reply text for this rule
    pub reply: String,
}

impl KeywordRule {
    /// Create a rule from keywords and a reply
    pub fn new(keywords: &[&str], reply: impl Into<String>) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            reply: reply.into(),
        }
    }

    fn matches(&self, lowercase_input: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| !k.is_empty() && lowercase_input.contains(k.as_str()))
    }
}

/// The built-in keyword table
#[must_use]
pub fn default_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new(&["hello", "hi"], GREETING),
        KeywordRule::new(&["help"], HELP),
        KeywordRule::new(&["product", "service"], PRODUCTS),
        KeywordRule::new(&["price", "cost"], PRICING),
        KeywordRule::new(&["thank"], THANKS),
    ]
}

/// The built-in card demo
#[must_use]
pub fn default_cards() -> Vec<CardRecord> {
    vec![
        CardRecord::new(
            "https://images.unsplash.com/photo-1488590528505-98d2b5aba04b",
            "Web Development",
            "Learn to build beautiful, responsive websites with the latest web technologies.",
            "Learn More",
        ),
        CardRecord::new(
            "https://images.unsplash.com/photo-1518770660439-4636190af475",
            "Machine Learning",
            "Discover how AI and ML are transforming industries and creating new opportunities.",
            "Explore",
        ),
        CardRecord::new(
            "https://images.unsplash.com/photo-1461749280684-dccba630e2f6",
            "Cloud Computing",
            "Master cloud technologies and learn to deploy scalable applications.",
            "Get Started",
        ),
    ]
}

/// Keyword-table [`ResponseStrategy`]
#[derive(Clone, Debug)]
pub struct CannedResponder {
    rules: Vec<KeywordRule>,
    fallback: String,
    cards: Vec<CardRecord>,
}

impl Default for CannedResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl CannedResponder {
    /// Responder with the built-in table and card demo
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: default_rules(),
            fallback: FALLBACK.to_string(),
            cards: default_cards(),
        }
    }

    /// Replace the keyword table
    #[must_use]
    pub fn with_rules(mut self, rules: Vec<KeywordRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Replace the fallback reply
    #[must_use]
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    /// Replace the cards returned for `LIST`
    #[must_use]
    pub fn with_cards(mut self, cards: Vec<CardRecord>) -> Self {
        self.cards = cards;
        self
    }

    /// The keyword table in evaluation order
    #[must_use]
    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }
}

impl ResponseStrategy for CannedResponder {
    fn name(&self) -> &str {
        "canned"
    }

    fn generate(&self, input: &str) -> StreamResult<Reply> {
        if is_list_command(input) {
            return Ok(Reply::whole(render_cards(&self.cards)));
        }

        let lowered = input.to_lowercase();
        let text = self
            .rules
            .iter()
            .find(|rule| rule.matches(&lowered))
            .map_or(self.fallback.as_str(), |rule| rule.reply.as_str());

        if text.trim().is_empty() {
            return Err(StreamError::Generation(
                "responder produced an empty reply".to_string(),
            ));
        }

        Ok(Reply::words(text))
    }
}
