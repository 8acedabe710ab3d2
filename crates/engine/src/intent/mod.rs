//! Rule-based intent extraction. No network calls, no model calls.

pub mod language;
pub mod market;

pub use language::Language;
pub use market::{MarketIntent, MarketIntentDetector};
