//! Market data source trait: live token quotes consumed by the engine.
//!
//! Two lookups are needed: a direct quote by canonical id, and a free-text
//! search that resolves an unknown phrase ("shiba", "ton coin") to an id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MarketDataError;

/// A live quote for one token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketQuote {
    /// Canonical id at the provider (e.g. "bitcoin")
    pub token_id: String,

    /// Display symbol, when the provider knows one (e.g. "BTC")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,

    pub price_usd: f64,

    /// Percent change over the last 24 hours
    #[serde(default)]
    pub change_24h_percent: f64,

    pub as_of: DateTime<Utc>,
}

impl MarketQuote {
    /// Label shown to users: the symbol when known, else the upper-cased id.
    pub fn label(&self) -> String {
        self.symbol
            .clone()
            .unwrap_or_else(|| self.token_id.to_uppercase())
    }
}

/// An external market-data feed.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Human-readable name (e.g. "coingecko").
    fn name(&self) -> &str;

    /// Quote by canonical id. `Ok(None)` means the id is unknown.
    async fn price(&self, token_id: &str) -> Result<Option<MarketQuote>, MarketDataError>;

    /// Resolve a free-text phrase to a canonical id.
    async fn search(&self, query: &str) -> Result<Option<String>, MarketDataError>;
}
