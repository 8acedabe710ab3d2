//! # Chatwright Engine
//!
//! The answer-generation pipeline shared by every platform adapter:
//!
//! 1. **Knowledge** compiles a bot's enabled sources into one bounded blob
//! 2. **Cache** keeps compiled knowledge, prompts and quotes per version
//! 3. **Intent** detects the reply language and market-data requests
//! 4. **Market** turns a token phrase into a live quote block
//! 5. **Prompt** renders the system instruction
//! 6. **Generator** runs the primary attempt and, on timeout, one fallback
//! 7. **Normalize** tidies the model's output

pub mod cache;
pub mod generator;
pub mod intent;
pub mod knowledge;
pub mod market;
pub mod normalize;
pub mod prompt;

pub use cache::{CacheService, CacheStats, VersionedCache};
pub use generator::{AnswerGenerator, GenerationRequest, GenerationResult, GenerationSettings, Tier};
pub use intent::{Language, MarketIntent, MarketIntentDetector};
pub use knowledge::{CompiledKnowledge, SectionUsage, compile, truncate};
pub use market::{MarketContext, MarketDataAdapter, TokenAliases};
pub use normalize::normalize;
pub use prompt::PromptAssembler;
