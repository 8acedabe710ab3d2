//! # Chatwright Core
//!
//! Domain types, traits, and error definitions for the Chatwright answer
//! pipeline. This crate has **zero framework dependencies**; it defines the
//! domain model that the engine, providers, and outer surfaces build on.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (language model, market data feed) is defined
//! as a trait here. Implementations live in `chatwright-providers`, and the
//! engine only ever sees the trait objects. This enables:
//! - Swapping backends via configuration
//! - Testing the pipeline with scripted mock providers
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod market;
pub mod message;
pub mod profile;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{Error, GenerationError, MarketDataError, ProviderError, Result};
pub use market::{MarketDataSource, MarketQuote};
pub use message::{Message, Role};
pub use profile::{
    BotProfile, CatalogItem, Document, Faq, Platform, PriceEntry, Product, RecordData, Service,
    StructuredRecord, UrlSource,
};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
