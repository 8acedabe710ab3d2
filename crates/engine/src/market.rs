//! Market data adapter: resolves a token phrase to a live quote and renders
//! it as prompt context.
//!
//! Failures never reach the caller: a timed-out or broken market feed turns
//! into a "no market data available" block and a warning in the log.

use chatwright_core::error::MarketDataError;
use chatwright_core::market::{MarketDataSource, MarketQuote};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::cache::CacheService;
use crate::intent::MarketIntent;

const BUILT_IN_ALIASES: &[(&str, &str)] = &[
    ("oft", "onfa"),
    ("onfa", "onfa"),
    ("btc", "bitcoin"),
    ("bitcoin", "bitcoin"),
    ("eth", "ethereum"),
    ("ethereum", "ethereum"),
    ("bnb", "binancecoin"),
    ("usdt", "tether"),
    ("sol", "solana"),
    ("doge", "dogecoin"),
];

/// Phrase → canonical provider id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenAliases {
    map: BTreeMap<String, String>,
}

impl Default for TokenAliases {
    fn default() -> Self {
        Self {
            map: BUILT_IN_ALIASES
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl TokenAliases {
    /// Built-in table with `overrides` merged on top.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut aliases = Self::default();
        for (phrase, id) in overrides {
            aliases.map.insert(Self::normalize(phrase), id.trim().to_lowercase());
        }
        aliases
    }

    /// Lowercase, strip a leading `$`, join words with `-`.
    pub fn normalize(phrase: &str) -> String {
        phrase
            .trim()
            .trim_start_matches('$')
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("-")
    }

    /// Canonical id for a phrase; unknown phrases pass through normalized.
    pub fn resolve(&self, phrase: &str) -> String {
        let normalized = Self::normalize(phrase);
        self.map.get(&normalized).cloned().unwrap_or(normalized)
    }

    pub fn contains(&self, phrase: &str) -> bool {
        self.map.contains_key(phrase)
    }
}

/// Rendered market block for the prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketContext {
    pub text: String,
    pub quote: Option<MarketQuote>,
}

impl MarketContext {
    pub fn is_available(&self) -> bool {
        self.quote.is_some()
    }

    pub fn unavailable(phrase: &str) -> Self {
        Self {
            text: format!(
                "=== LIVE MARKET DATA ===\nNo market data available for \"{phrase}\" right now. \
                 Say so plainly and do not guess a price."
            ),
            quote: None,
        }
    }

    /// Quote block, plus a calculation block when an amount was given.
    pub fn for_quote(intent: &MarketIntent, quote: MarketQuote) -> Self {
        let mut text = format_quote(&quote);
        if let Some(amount) = intent.amount() {
            text.push_str("\n\n");
            text.push_str(&format_calculation(&quote, amount));
        }
        Self {
            text,
            quote: Some(quote),
        }
    }
}

pub fn format_price(price: f64) -> String {
    if price >= 1.0 {
        format!("${price:.2}")
    } else if price >= 0.01 {
        format!("${price:.4}")
    } else {
        format!("${price:.8}")
    }
}

fn trend_marker(change: f64) -> &'static str {
    if change > 0.0 {
        "📈"
    } else if change < 0.0 {
        "📉"
    } else {
        "➖"
    }
}

pub fn format_quote(quote: &MarketQuote) -> String {
    format!(
        "=== LIVE MARKET DATA ===\n\
         Token: {label} ({id})\n\
         Price: {price} USD\n\
         24h change: {marker} {change:+.2}%\n\
         As of: {as_of}",
        label = quote.label(),
        id = quote.token_id,
        price = format_price(quote.price_usd),
        marker = trend_marker(quote.change_24h_percent),
        change = quote.change_24h_percent,
        as_of = quote.as_of.format("%Y-%m-%d %H:%M UTC"),
    )
}

fn format_calculation(quote: &MarketQuote, amount: f64) -> String {
    let value = quote.price_usd * amount;
    format!(
        "=== DEPOSIT CALCULATION CONTEXT ===\n\
         Deposit: {amount} {label}\n\
         Current value: {amount} x {price} = {value}\n\
         Look up the deposit terms and interest rates for {label} in the knowledge base. \
         For each applicable term, compute the profit on this deposit and its USD value at \
         the current price. Show deposit, term, rate and profit clearly.",
        label = quote.label(),
        price = format_price(quote.price_usd),
        value = format_price(value),
    )
}

/// Looks up live quotes through a [`MarketDataSource`], with a short-TTL
/// quote cache and one search-based retry for unknown phrases.
pub struct MarketDataAdapter {
    source: Arc<dyn MarketDataSource>,
    cache: Arc<CacheService>,
    aliases: TokenAliases,
    timeout: Duration,
}

impl MarketDataAdapter {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        cache: Arc<CacheService>,
        aliases: TokenAliases,
        timeout: Duration,
    ) -> Self {
        Self {
            source,
            cache,
            aliases,
            timeout,
        }
    }

    pub fn aliases(&self) -> &TokenAliases {
        &self.aliases
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, MarketDataError>>,
    ) -> Result<T, MarketDataError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                MarketDataError::Unavailable(format!("no answer within {:?}", self.timeout))
            })?
    }

    async fn fetch(&self, token_id: &str) -> Result<Option<MarketQuote>, MarketDataError> {
        if let Some(quote) = self.cache.quote(token_id) {
            return Ok(Some(quote));
        }
        let quote = self.bounded(self.source.price(token_id)).await?;
        if let Some(quote) = &quote {
            self.cache.store_quote(token_id, quote.clone());
        }
        Ok(quote)
    }

    async fn try_lookup(&self, phrase: &str) -> Result<Option<MarketQuote>, MarketDataError> {
        let token_id = self.aliases.resolve(phrase);
        if token_id.is_empty() {
            return Ok(None);
        }

        if let Some(quote) = self.fetch(&token_id).await? {
            return Ok(Some(quote));
        }

        let Some(resolved) = self.bounded(self.source.search(phrase)).await? else {
            return Ok(None);
        };
        if resolved == token_id {
            return Ok(None);
        }
        debug!(phrase, resolved = %resolved, "Resolved token through search");

        let quote = self.fetch(&resolved).await?;
        if let Some(quote) = &quote {
            self.cache.store_quote(&token_id, quote.clone());
        }
        Ok(quote)
    }

    /// Live quote for a token phrase, or `None` when unknown or unavailable.
    pub async fn lookup(&self, phrase: &str) -> Option<MarketQuote> {
        match self.try_lookup(phrase).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!(
                    source = self.source.name(),
                    phrase,
                    error = %e,
                    "MarketDataUnavailable"
                );
                None
            }
        }
    }

    /// Prompt context for a detected intent.
    pub async fn context_for(&self, intent: &MarketIntent) -> MarketContext {
        match self.lookup(intent.token()).await {
            Some(quote) => MarketContext::for_quote(intent, quote),
            None => MarketContext::unavailable(intent.token()),
        }
    }
}
