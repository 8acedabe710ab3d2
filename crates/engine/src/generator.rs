//! Answer generator: the entry point platform adapters call.
//!
//! ```text
//! Start → Primary ─┬─ success ─────────────────────────→ normalize → reply
//!                  ├─ failure (429/401/403/other) ─────→ classified error
//!                  └─ timeout → Fallback ─┬─ success ──→ normalize → reply
//!                                         └─ any failure → UpstreamTimeout
//! ```
//!
//! Each attempt races the provider call against the attempt timeout. When
//! the timer wins, the in-flight call's future is dropped, which cancels the
//! underlying HTTP request. The fallback only starts after that.

use chatwright_config::AppConfig;
use chatwright_core::error::{GenerationError, ProviderError};
use chatwright_core::profile::{BotProfile, Platform};
use chatwright_core::provider::{Provider, ProviderRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::cache::CacheService;
use crate::intent::{Language, MarketIntentDetector, language};
use crate::market::{MarketContext, MarketDataAdapter};
use crate::normalize::normalize;
use crate::prompt::PromptAssembler;

/// Budgets and limits for the two tiers.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub attempt_timeout: Duration,
    pub primary_knowledge_budget: usize,
    pub fallback_knowledge_budget: usize,
    pub primary_max_tokens: u32,
    pub fallback_max_tokens: u32,
}

impl GenerationSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let model = config
            .providers
            .get(&config.default_provider)
            .and_then(|p| p.default_model.clone())
            .unwrap_or_else(|| config.default_model.clone());
        let generation = &config.generation;

        Self {
            model,
            temperature: config.default_temperature,
            attempt_timeout: Duration::from_secs(generation.attempt_timeout_secs),
            primary_knowledge_budget: generation.primary_knowledge_budget,
            fallback_knowledge_budget: generation.fallback_knowledge_budget,
            primary_max_tokens: generation.primary_max_tokens,
            fallback_max_tokens: generation.fallback_max_tokens,
        }
    }

    fn budget(&self, tier: Tier) -> (usize, u32) {
        match tier {
            Tier::Primary => (self.primary_knowledge_budget, self.primary_max_tokens),
            Tier::Fallback => (self.fallback_knowledge_budget, self.fallback_max_tokens),
        }
    }
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Which attempt produced the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Primary,
    Fallback,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub profile: BotProfile,
    pub message: String,
    #[serde(default)]
    pub platform: Platform,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub reply: String,
    pub tier: Tier,
    pub language: Language,
    pub market_data_used: bool,
}

enum AttemptError {
    TimedOut,
    Failed(ProviderError),
}

pub struct AnswerGenerator {
    provider: Arc<dyn Provider>,
    cache: Arc<CacheService>,
    market: Option<MarketDataAdapter>,
    detector: MarketIntentDetector,
    assembler: PromptAssembler,
    settings: GenerationSettings,
}

impl AnswerGenerator {
    pub fn new(
        provider: Arc<dyn Provider>,
        cache: Arc<CacheService>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            provider,
            cache,
            market: None,
            detector: MarketIntentDetector::default(),
            assembler: PromptAssembler::new(),
            settings,
        }
    }

    /// Enable market context; intent detection uses the adapter's aliases.
    pub fn with_market(mut self, adapter: MarketDataAdapter) -> Self {
        self.detector = MarketIntentDetector::new(adapter.aliases().clone());
        self.market = Some(adapter);
        self
    }

    pub fn cache(&self) -> &Arc<CacheService> {
        &self.cache
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// Evict a bot's compiled knowledge and prompts ahead of expiry.
    pub fn invalidate_knowledge_cache(&self, bot_id: &str) -> usize {
        self.cache.invalidate(bot_id)
    }

    /// One final reply string, or a classified error.
    pub async fn generate_reply(
        &self,
        profile: &BotProfile,
        message: &str,
        platform: Platform,
    ) -> Result<String, GenerationError> {
        let request = GenerationRequest {
            profile: profile.clone(),
            message: message.to_string(),
            platform,
        };
        self.generate(&request).await.map(|result| result.reply)
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        request.profile.validate()?;
        if request.message.trim().is_empty() {
            return Err(GenerationError::Validation("message is empty".into()));
        }

        let bot_id = request.profile.id.as_str();
        let language = language::detect(&request.message);
        let market = self.market_context(&request.message).await;
        let started = Instant::now();

        let (raw, tier) = match self
            .attempt(Tier::Primary, request, language, market.as_ref())
            .await
        {
            Ok(text) => (text, Tier::Primary),
            Err(AttemptError::Failed(e)) => {
                let error = GenerationError::from(e);
                warn!(bot_id, tier = "primary", kind = error.kind(), error = %error, "Generation failed");
                return Err(error);
            }
            Err(AttemptError::TimedOut) => {
                warn!(
                    bot_id,
                    timeout_secs = self.settings.attempt_timeout.as_secs(),
                    "Primary attempt timed out, retrying with reduced budget"
                );
                match self
                    .attempt(Tier::Fallback, request, language, market.as_ref())
                    .await
                {
                    Ok(text) => (text, Tier::Fallback),
                    Err(e) => {
                        if let AttemptError::Failed(e) = &e {
                            warn!(bot_id, tier = "fallback", error = %e, "Fallback attempt failed");
                        }
                        return Err(GenerationError::UpstreamTimeout {
                            attempts: 2,
                            timeout_secs: self.settings.attempt_timeout.as_secs(),
                        });
                    }
                }
            }
        };

        let reply = normalize(&raw);
        if reply.is_empty() {
            return Err(GenerationError::UnknownUpstream(
                "provider returned an empty reply".into(),
            ));
        }

        info!(
            bot_id,
            tier = tier.as_str(),
            provider = self.provider.name(),
            language = language.name(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Reply generated"
        );

        Ok(GenerationResult {
            reply,
            tier,
            language,
            market_data_used: market.as_ref().is_some_and(MarketContext::is_available),
        })
    }

    async fn market_context(&self, message: &str) -> Option<MarketContext> {
        let adapter = self.market.as_ref()?;
        let intent = self.detector.detect(message)?;
        Some(adapter.context_for(&intent).await)
    }

    /// Prompt for one tier. Market context is per message, so those prompts
    /// skip the prompt cache.
    fn prompt_for(
        &self,
        request: &GenerationRequest,
        budget: usize,
        market: Option<&MarketContext>,
    ) -> Arc<str> {
        let profile = &request.profile;
        let build = || {
            let knowledge = self.cache.knowledge(profile, Some(budget));
            self.assembler
                .assemble(profile, &knowledge, request.platform, market)
        };
        match market {
            Some(_) => Arc::from(build()),
            None => self.cache.prompt(profile, request.platform, budget, build),
        }
    }

    async fn attempt(
        &self,
        tier: Tier,
        request: &GenerationRequest,
        language: Language,
        market: Option<&MarketContext>,
    ) -> Result<String, AttemptError> {
        let (budget, max_tokens) = self.settings.budget(tier);
        let prompt = self.prompt_for(request, budget, market);

        let provider_request = ProviderRequest::new(
            self.settings.model.clone(),
            prompt.as_ref(),
            language.enforcement_instruction(),
            request.message.clone(),
        )
        .with_temperature(self.settings.temperature)
        .with_max_tokens(max_tokens);

        match tokio::time::timeout(
            self.settings.attempt_timeout,
            self.provider.complete(provider_request),
        )
        .await
        {
            Err(_elapsed) => Err(AttemptError::TimedOut),
            Ok(Err(e)) if e.is_timeout() => Err(AttemptError::TimedOut),
            Ok(Err(e)) => Err(AttemptError::Failed(e)),
            Ok(Ok(response)) => Ok(response.message.content),
        }
    }
}
