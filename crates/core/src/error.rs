//! Error types for the Chatwright domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Only [`GenerationError`] ever reaches a platform adapter; provider and
//! market-data errors are classified or absorbed inside the engine.

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for the outer surfaces (CLI, gateway bootstrap).
#[derive(Debug, Error)]
pub enum Error {
    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Transport-level failures reported by a language-model provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Whether this failure means the provider did not answer in time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Classified failure of a reply generation, surfaced to platform adapters.
///
/// Adapters pick a user-facing apology per [`GenerationError::kind`]; the
/// engine itself never produces localized strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Missing profile data or empty message; rejected before any network call.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Both the primary and the fallback attempt exceeded their time limit.
    #[error("Upstream timed out after {attempts} attempt(s) of {timeout_secs}s each")]
    UpstreamTimeout { attempts: u32, timeout_secs: u64 },

    /// The provider signaled quota exhaustion.
    #[error("Rate limited by the language model provider")]
    RateLimited,

    /// The provider rejected our credentials.
    #[error("Language model provider rejected credentials: {0}")]
    AuthFailure(String),

    /// Anything else the provider reported.
    #[error("Language model provider error: {0}")]
    UnknownUpstream(String),
}

impl GenerationError {
    /// Machine-readable category tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::UpstreamTimeout { .. } => "upstream_timeout",
            Self::RateLimited => "rate_limited",
            Self::AuthFailure(_) => "auth_failure",
            Self::UnknownUpstream(_) => "unknown_upstream",
        }
    }

    /// Whether asking the user to "try again shortly" makes sense.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamTimeout { .. } | Self::RateLimited)
    }
}

impl From<ProviderError> for GenerationError {
    /// Classify a non-timeout provider failure by its reported status.
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::RateLimited { .. } => Self::RateLimited,
            ProviderError::ApiError { status_code: 429, .. } => Self::RateLimited,
            ProviderError::AuthenticationFailed(msg) => Self::AuthFailure(msg),
            ProviderError::ApiError {
                status_code: 401 | 403,
                message,
            } => Self::AuthFailure(message),
            other => Self::UnknownUpstream(other.to_string()),
        }
    }
}

/// Market-data lookups never fail a request; this only travels as far as
/// the adapter, which logs it and carries on without market context.
#[derive(Debug, Clone, Error)]
pub enum MarketDataError {
    #[error("Market data unavailable: {0}")]
    Unavailable(String),

    #[error("Unexpected market data payload: {0}")]
    InvalidPayload(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = ProviderError::ApiError {
            status_code: 500,
            message: "Internal Server Error".into(),
        };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("Internal Server Error"));
    }

    #[test]
    fn top_level_error_wraps_generation_and_io() {
        let err: Error = GenerationError::Validation("bot profile has no id".into()).into();
        assert!(matches!(err, Error::Generation(_)));
        assert!(err.to_string().contains("no id"));

        let err = Error::Io {
            path: PathBuf::from("/tmp/bot.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert!(err.to_string().contains("/tmp/bot.json"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn rate_limits_classify_as_rate_limited() {
        let by_variant: GenerationError = ProviderError::RateLimited {
            retry_after_secs: 5,
        }
        .into();
        let by_status: GenerationError = ProviderError::ApiError {
            status_code: 429,
            message: "quota".into(),
        }
        .into();
        assert_eq!(by_variant, GenerationError::RateLimited);
        assert_eq!(by_status, GenerationError::RateLimited);
    }

    #[test]
    fn auth_statuses_classify_as_auth_failure() {
        for status in [401, 403] {
            let err: GenerationError = ProviderError::ApiError {
                status_code: status,
                message: "denied".into(),
            }
            .into();
            assert_eq!(err.kind(), "auth_failure");
        }
        let err: GenerationError = ProviderError::AuthenticationFailed("bad key".into()).into();
        assert_eq!(err, GenerationError::AuthFailure("bad key".into()));
    }

    #[test]
    fn other_failures_are_unknown_upstream() {
        let err: GenerationError = ProviderError::Network("conn refused".into()).into();
        assert_eq!(err.kind(), "unknown_upstream");
        assert!(err.to_string().contains("conn refused"));
    }

    #[test]
    fn retryable_categories() {
        assert!(GenerationError::RateLimited.is_retryable());
        assert!(
            GenerationError::UpstreamTimeout {
                attempts: 2,
                timeout_secs: 15
            }
            .is_retryable()
        );
        assert!(!GenerationError::Validation("empty".into()).is_retryable());
        assert!(!GenerationError::AuthFailure("x".into()).is_retryable());
    }
}
