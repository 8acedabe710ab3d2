//! External collaborator clients for Chatwright.
//!
//! LLM providers implement `chatwright_core::Provider`; market data sources
//! implement `chatwright_core::MarketDataSource`. The router builds both from
//! configuration.

pub mod coingecko;
pub mod openai_compat;
pub mod router;

pub use coingecko::CoinGeckoSource;
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config, build_market_source};
