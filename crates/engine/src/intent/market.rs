//! Market-data intent detection.
//!
//! An ordered list of `(pattern, extractor)` rules, first match wins. When
//! no rule matches, short messages are taken as the token phrase itself and
//! longer ones are scanned for well-known tickers.

use regex::{Captures, Regex};
use serde::Serialize;
use std::sync::LazyLock;

use crate::market::TokenAliases;

/// Words that open the gate: price talk in English/Vietnamese, generic
/// crypto terms, and calculation words.
const KEYWORDS: &[&str] = &[
    "price", "prices", "value", "worth", "giá", "bao nhiêu", "coin", "token", "crypto",
    "calculate", "tính", "lãi", "profit", "interest",
];

/// Never a token: dropped from short phrases and refused as a rule capture.
const FILLER: &[&str] = &[
    "of", "của", "là", "the", "is", "what", "how", "much", "now", "today", "bao", "nhiêu",
    "hiện", "tại", "nay", "your", "my", "our", "this", "that", "a", "an",
];

/// Tickers recognised anywhere in a longer message.
const SCAN_TICKERS: &[&str] = &["oft", "onfa", "btc", "bitcoin", "eth", "ethereum", "bnb"];

const MIN_PHRASE_CHARS: usize = 2;
const MAX_PHRASE_CHARS: usize = 19;

/// A recognised request for live market data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarketIntent {
    Price { token: String },
    Calculation { token: String, amount: f64 },
}

impl MarketIntent {
    pub fn token(&self) -> &str {
        match self {
            Self::Price { token } | Self::Calculation { token, .. } => token,
        }
    }

    pub fn amount(&self) -> Option<f64> {
        match self {
            Self::Price { .. } => None,
            Self::Calculation { amount, .. } => Some(*amount),
        }
    }
}

struct IntentRule {
    name: &'static str,
    pattern: Regex,
    extract: fn(&Captures<'_>) -> Option<MarketIntent>,
}

fn calculation(caps: &Captures<'_>) -> Option<MarketIntent> {
    let amount = caps.get(1)?.as_str().replace(',', "").parse::<f64>().ok()?;
    Some(MarketIntent::Calculation {
        token: caps.get(2)?.as_str().to_string(),
        amount,
    })
}

fn price(caps: &Captures<'_>) -> Option<MarketIntent> {
    Some(MarketIntent::Price {
        token: caps.get(1)?.as_str().to_string(),
    })
}

static RULES: LazyLock<Vec<IntentRule>> = LazyLock::new(|| {
    vec![
        IntentRule {
            name: "calculation",
            pattern: Regex::new(
                r"(?:calculate|tính|lãi|profit|interest)\s+(?:(?:for|cho)\s+)?(\d[\d,]*(?:\.\d+)?)\s+([\p{L}\p{N}][\p{L}\p{N}\-]*)",
            )
            .expect("calculation pattern is valid"),
            extract: calculation,
        },
        IntentRule {
            name: "price",
            pattern: Regex::new(
                r"(?:price|giá|value)\s+(?:(?:of|của|là|the|is|for)\s+)*([\p{L}\p{N}][\p{L}\p{N}\-]*)",
            )
            .expect("price pattern is valid"),
            extract: price,
        },
    ]
});

/// Recognises price and profit-calculation requests.
#[derive(Debug, Clone, Default)]
pub struct MarketIntentDetector {
    aliases: TokenAliases,
}

impl MarketIntentDetector {
    pub fn new(aliases: TokenAliases) -> Self {
        Self { aliases }
    }

    pub fn aliases(&self) -> &TokenAliases {
        &self.aliases
    }

    /// Whether the message talks about prices, tokens, or a known alias.
    pub fn is_market_message(&self, message: &str) -> bool {
        let lower = message.to_lowercase();
        KEYWORDS.iter().any(|k| lower.contains(k))
            || words(&lower).iter().any(|w| self.aliases.contains(w))
    }

    /// Gated detection: `None` unless the message looks market-related.
    pub fn detect(&self, message: &str) -> Option<MarketIntent> {
        if !self.is_market_message(message) {
            return None;
        }
        self.extract_token_phrase(message)
    }

    /// Run the rules and the fallback without the keyword gate.
    pub fn extract_token_phrase(&self, message: &str) -> Option<MarketIntent> {
        let lower = message.to_lowercase();

        for rule in RULES.iter() {
            if let Some(intent) = rule
                .pattern
                .captures(&lower)
                .and_then(|caps| (rule.extract)(&caps))
                .filter(|intent| is_token_candidate(intent.token()))
            {
                tracing::trace!(rule = rule.name, token = intent.token(), "Market intent matched");
                return Some(intent);
            }
        }

        self.fallback(&lower)
    }

    fn fallback(&self, lower: &str) -> Option<MarketIntent> {
        let words = words(lower);

        if words.len() <= 2 {
            let phrase = words
                .iter()
                .filter(|w| !is_keyword(w) && !FILLER.contains(&w.as_str()))
                .cloned()
                .collect::<Vec<_>>()
                .join(" ");
            return is_valid_phrase(&phrase).then_some(MarketIntent::Price { token: phrase });
        }

        words
            .iter()
            .find(|w| SCAN_TICKERS.contains(&w.as_str()))
            .map(|w| MarketIntent::Price {
                token: self.aliases.resolve(w),
            })
    }
}

fn words(lower: &str) -> Vec<String> {
    lower
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

fn is_token_candidate(word: &str) -> bool {
    is_valid_phrase(word) && !FILLER.contains(&word)
}

fn is_valid_phrase(phrase: &str) -> bool {
    let len = phrase.chars().count();
    (MIN_PHRASE_CHARS..=MAX_PHRASE_CHARS).contains(&len) && !is_keyword(phrase)
}
