//! CoinGecko-compatible market data source.
//!
//! Two endpoints are used: `/simple/price` for a quote by canonical id and
//! `/search` to resolve a free-text phrase to an id. The public API and the
//! keyed "demo"/"pro" tiers share the same shapes.

use async_trait::async_trait;
use chatwright_config::MarketConfig;
use chatwright_core::error::MarketDataError;
use chatwright_core::market::{MarketDataSource, MarketQuote};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Market data client for CoinGecko and API-compatible mirrors.
pub struct CoinGeckoSource {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl CoinGeckoSource {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        }
    }

    pub fn from_config(config: &MarketConfig) -> Self {
        Self::new(
            config.api_url.as_deref().unwrap_or(DEFAULT_BASE_URL),
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<String, MarketDataError> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.client.get(&url).query(query);
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MarketDataError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarketDataError::Unavailable(format!(
                "{path} returned {}",
                status.as_u16()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| MarketDataError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl MarketDataSource for CoinGeckoSource {
    fn name(&self) -> &str {
        "coingecko"
    }

    async fn price(&self, token_id: &str) -> Result<Option<MarketQuote>, MarketDataError> {
        debug!(token_id, "Fetching market quote");
        let body = self
            .get(
                "/simple/price",
                &[
                    ("ids", token_id),
                    ("vs_currencies", "usd"),
                    ("include_24hr_change", "true"),
                    ("include_last_updated_at", "true"),
                ],
            )
            .await?;
        parse_price_payload(token_id, &body, Utc::now())
    }

    async fn search(&self, query: &str) -> Result<Option<String>, MarketDataError> {
        debug!(query, "Searching market data provider");
        let body = self.get("/search", &[("query", query)]).await?;
        parse_search_payload(query, &body)
    }
}

#[derive(Debug, Deserialize)]
struct SimplePrice {
    usd: Option<f64>,
    #[serde(default)]
    usd_24h_change: Option<f64>,
    #[serde(default)]
    last_updated_at: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    coins: Vec<SearchCoin>,
}

#[derive(Debug, Deserialize)]
struct SearchCoin {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    symbol: String,
}

/// Parse a `/simple/price` body. An id missing from the payload is unknown,
/// not an error.
pub fn parse_price_payload(
    token_id: &str,
    body: &str,
    now: DateTime<Utc>,
) -> Result<Option<MarketQuote>, MarketDataError> {
    let mut prices: HashMap<String, SimplePrice> =
        serde_json::from_str(body).map_err(|e| MarketDataError::InvalidPayload(e.to_string()))?;

    let Some(entry) = prices.remove(token_id) else {
        return Ok(None);
    };
    let Some(price_usd) = entry.usd else {
        return Ok(None);
    };

    let as_of = entry
        .last_updated_at
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or(now);

    Ok(Some(MarketQuote {
        token_id: token_id.to_string(),
        symbol: None,
        price_usd,
        change_24h_percent: entry.usd_24h_change.unwrap_or(0.0),
        as_of,
    }))
}

/// Parse a `/search` body into a canonical id. An exact symbol or name match
/// wins over the provider's first (most relevant) result.
pub fn parse_search_payload(query: &str, body: &str) -> Result<Option<String>, MarketDataError> {
    let response: SearchResponse =
        serde_json::from_str(body).map_err(|e| MarketDataError::InvalidPayload(e.to_string()))?;

    let wanted = query.trim().to_lowercase();
    let exact = response
        .coins
        .iter()
        .find(|c| c.symbol.to_lowercase() == wanted || c.name.to_lowercase() == wanted);

    Ok(exact
        .or_else(|| response.coins.first())
        .map(|c| c.id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_price() {
        let body = r#"{"bitcoin":{"usd":64250.5,"usd_24h_change":-1.25,"last_updated_at":1767323045}}"#;
        let quote = parse_price_payload("bitcoin", body, Utc::now())
            .unwrap()
            .unwrap();
        assert_eq!(quote.token_id, "bitcoin");
        assert_eq!(quote.price_usd, 64250.5);
        assert_eq!(quote.change_24h_percent, -1.25);
        assert_eq!(quote.as_of.timestamp(), 1_767_323_045);
    }

    #[test]
    fn unknown_id_is_none() {
        assert!(parse_price_payload("nope", "{}", Utc::now())
            .unwrap()
            .is_none());
        assert!(parse_price_payload("nope", r#"{"nope":{}}"#, Utc::now())
            .unwrap()
            .is_none());
    }

    #[test]
    fn missing_timestamp_falls_back_to_now() {
        let now = Utc::now();
        let quote = parse_price_payload("onfa", r#"{"onfa":{"usd":0.12}}"#, now)
            .unwrap()
            .unwrap();
        assert_eq!(quote.as_of, now);
        assert_eq!(quote.change_24h_percent, 0.0);
    }

    #[test]
    fn malformed_price_body_is_invalid_payload() {
        assert!(matches!(
            parse_price_payload("bitcoin", "<html>", Utc::now()),
            Err(MarketDataError::InvalidPayload(_))
        ));
    }

    #[test]
    fn search_prefers_exact_symbol() {
        let body = r#"{"coins":[
            {"id":"wrapped-ton","name":"Wrapped TON","symbol":"WTON"},
            {"id":"the-open-network","name":"Toncoin","symbol":"TON"}
        ]}"#;
        assert_eq!(
            parse_search_payload("ton", body).unwrap().as_deref(),
            Some("the-open-network")
        );
    }

    #[test]
    fn search_falls_back_to_first_result() {
        let body = r#"{"coins":[{"id":"shiba-inu","name":"Shiba Inu","symbol":"SHIB"}]}"#;
        assert_eq!(
            parse_search_payload("shiba", body).unwrap().as_deref(),
            Some("shiba-inu")
        );
        assert_eq!(parse_search_payload("zzz", r#"{"coins":[]}"#).unwrap(), None);
    }

    #[test]
    fn from_config_uses_default_url() {
        let source = CoinGeckoSource::from_config(&MarketConfig::default());
        assert_eq!(source.base_url, DEFAULT_BASE_URL);
        assert!(source.api_key.is_none());
        assert_eq!(source.name(), "coingecko");
    }

    #[tokio::test]
    async fn unreachable_feed_is_unavailable() {
        let source = CoinGeckoSource::new("http://127.0.0.1:9", None, Duration::from_secs(2));
        assert!(matches!(
            source.price("bitcoin").await,
            Err(MarketDataError::Unavailable(_))
        ));
    }
}
