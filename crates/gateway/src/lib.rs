//! HTTP gateway for Chatwright.
//!
//! Platform adapters (Telegram, Discord, WhatsApp, the web widget) post a
//! bot profile snapshot plus the user's message and get a single reply
//! back. The settings store calls the invalidation endpoint whenever a bot
//! is edited; the dashboard uses the knowledge preview.
//!
//! Built on Axum.

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::{
    Router,
    http::{Method, StatusCode, header},
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use chatwright_config::AppConfig;
use chatwright_core::error::{Error, GenerationError};
use chatwright_core::profile::BotProfile;
use chatwright_engine::{
    AnswerGenerator, CacheService, CacheStats, GenerationRequest, GenerationResult,
    GenerationSettings, MarketDataAdapter, SectionUsage, TokenAliases, compile,
};

/// Shared application state for the gateway.
pub struct GatewayState {
    pub generator: Arc<AnswerGenerator>,
}

impl GatewayState {
    pub fn new(generator: AnswerGenerator) -> Self {
        Self {
            generator: Arc::new(generator),
        }
    }
}

type SharedState = Arc<GatewayState>;

/// Wire the configured provider, caches and market source into a generator.
pub fn build_generator(config: &AppConfig) -> Result<AnswerGenerator, Error> {
    let provider = chatwright_providers::build_from_config(config)
        .default()
        .ok_or_else(|| Error::Config {
            message: format!("no provider named '{}' is configured", config.default_provider),
        })?;

    let cache = Arc::new(CacheService::new(&config.cache));
    let generator = AnswerGenerator::new(
        provider,
        cache.clone(),
        GenerationSettings::from_config(config),
    );

    Ok(match chatwright_providers::build_market_source(config) {
        Some(source) => generator.with_market(MarketDataAdapter::new(
            source,
            cache,
            TokenAliases::with_overrides(&config.market.aliases),
            Duration::from_secs(config.market.timeout_secs),
        )),
        None => generator,
    })
}

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/reply", post(reply_handler))
        .route("/v1/bots/{bot_id}/invalidate", post(invalidate_handler))
        .route("/v1/knowledge/preview", post(preview_handler))
        .route("/v1/cache/stats", get(cache_stats_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let generator = build_generator(&config)?;
    let state = Arc::new(GatewayState::new(generator));
    let app = build_router(state, config.gateway.max_body_bytes);

    info!(addr = %addr, provider = %config.default_provider, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
    retryable: bool,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn status_for(err: &GenerationError) -> StatusCode {
    match err {
        GenerationError::Validation(_) => StatusCode::BAD_REQUEST,
        GenerationError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        GenerationError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        GenerationError::AuthFailure(_) | GenerationError::UnknownUpstream(_) => {
            StatusCode::BAD_GATEWAY
        }
    }
}

fn api_error(err: GenerationError) -> ApiError {
    (
        status_for(&err),
        Json(ErrorResponse {
            error: ErrorBody {
                kind: err.kind(),
                message: err.to_string(),
                retryable: err.is_retryable(),
            },
        }),
    )
}

/// Malformed or oversized bodies are reported in the same shape as
/// validation failures.
fn rejected(rejection: JsonRejection) -> ApiError {
    let (status, Json(body)) = api_error(GenerationError::Validation(rejection.body_text()));
    let status = match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
        _ => status,
    };
    (status, Json(body))
}

// ── Handlers ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn reply_handler(
    State(state): State<SharedState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Json<GenerationResult>, ApiError> {
    let Json(request) = payload.map_err(rejected)?;
    info!(
        bot_id = %request.profile.id,
        platform = %request.platform,
        message_len = request.message.len(),
        "v1/reply request"
    );

    state
        .generator
        .generate(&request)
        .await
        .map(Json)
        .map_err(api_error)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InvalidateResponse {
    bot_id: String,
    evicted: usize,
}

async fn invalidate_handler(
    State(state): State<SharedState>,
    Path(bot_id): Path<String>,
) -> Json<InvalidateResponse> {
    let evicted = state.generator.invalidate_knowledge_cache(&bot_id);
    info!(bot_id = %bot_id, evicted, "Bot caches invalidated");
    Json(InvalidateResponse { bot_id, evicted })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PreviewRequest {
    profile: BotProfile,
    #[serde(default)]
    max_length: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PreviewResponse {
    bot_id: String,
    length: usize,
    truncated: bool,
    placeholder: bool,
    usage: SectionUsage,
    text: String,
}

async fn preview_handler(
    payload: Result<Json<PreviewRequest>, JsonRejection>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let Json(PreviewRequest {
        profile,
        max_length,
    }) = payload.map_err(rejected)?;
    profile.validate().map_err(api_error)?;
    if max_length == Some(0) {
        warn!(bot_id = %profile.id, "Rejected knowledge preview with zero budget");
        return Err(api_error(GenerationError::Validation(
            "maxLength must be greater than zero".into(),
        )));
    }

    let knowledge = compile(&profile, max_length);
    Ok(Json(PreviewResponse {
        bot_id: profile.id,
        length: knowledge.len(),
        truncated: knowledge.truncated,
        placeholder: knowledge.is_placeholder(),
        usage: knowledge.usage,
        text: knowledge.text,
    }))
}

#[derive(Serialize)]
struct CacheStatsResponse {
    caches: Vec<CacheStats>,
}

async fn cache_stats_handler(State(state): State<SharedState>) -> Json<CacheStatsResponse> {
    Json(CacheStatsResponse {
        caches: state.generator.cache().stats(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use tower::ServiceExt;

    use chatwright_core::error::ProviderError;
    use chatwright_core::message::Message;
    use chatwright_core::provider::{Provider, ProviderRequest, ProviderResponse};

    enum Outcome {
        Reply(&'static str),
        Fail(ProviderError),
        Hang,
    }

    /// Lightweight mock provider for gateway tests.
    struct MockProvider {
        outcome: Outcome,
        calls: Mutex<usize>,
    }

    impl MockProvider {
        fn new(outcome: Outcome) -> Self {
            Self {
                outcome,
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait::async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &str {
            "gateway_mock"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            match &self.outcome {
                Outcome::Reply(text) => Ok(ProviderResponse {
                    message: Message::assistant(*text),
                    usage: None,
                    model: "mock-model".into(),
                }),
                Outcome::Fail(e) => Err(e.clone()),
                Outcome::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!("attempt timeout fires first")
                }
            }
        }
    }

    fn app(outcome: Outcome) -> Router {
        let provider: Arc<dyn chatwright_core::Provider> = Arc::new(MockProvider::new(outcome));
        let generator = AnswerGenerator::new(
            provider,
            Arc::new(CacheService::default()),
            GenerationSettings::default(),
        );
        build_router(Arc::new(GatewayState::new(generator)), 1024 * 1024)
    }

    fn profile() -> Value {
        json!({
            "id": "bot-1",
            "name": "Acme Helper",
            "welcomeMessage": "Hi",
            "updatedAt": "2026-01-02T03:04:05Z",
            "faqs": [
                { "question": "What are your hours?", "answer": "9am to 5pm, Monday to Friday" }
            ]
        })
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app(Outcome::Reply("ok")).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn reply_returns_normalized_text() {
        let req = post(
            "/v1/reply",
            json!({ "profile": profile(), "message": "what are your hours", "platform": "telegram" }),
        );

        let response = app(Outcome::Reply("We are open\n\n\n9 to 5.\n"))
            .oneshot(req)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["reply"], "We are open\n9 to 5.");
        assert_eq!(body["tier"], "primary");
        assert_eq!(body["language"], "english");
        assert_eq!(body["marketDataUsed"], false);
    }

    #[tokio::test]
    async fn empty_message_is_a_validation_error() {
        let req = post("/v1/reply", json!({ "profile": profile(), "message": "   " }));

        let response = app(Outcome::Reply("unused")).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"]["kind"], "validation");
        assert_eq!(body["error"]["retryable"], false);
    }

    #[tokio::test]
    async fn malformed_body_uses_error_shape() {
        let req = post("/v1/reply", json!({ "message": "no profile here" }));

        let response = app(Outcome::Reply("unused")).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["kind"], "validation");
    }

    #[tokio::test]
    async fn rate_limit_maps_to_429() {
        let req = post("/v1/reply", json!({ "profile": profile(), "message": "hello" }));

        let response = app(Outcome::Fail(ProviderError::RateLimited {
            retry_after_secs: 30,
        }))
        .oneshot(req)
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let body = body_json(response).await;
        assert_eq!(body["error"]["kind"], "rate_limited");
        assert_eq!(body["error"]["retryable"], true);
    }

    #[tokio::test]
    async fn auth_failure_maps_to_502() {
        let req = post("/v1/reply", json!({ "profile": profile(), "message": "hello" }));

        let response = app(Outcome::Fail(ProviderError::AuthenticationFailed(
            "bad key".into(),
        )))
        .oneshot(req)
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["error"]["kind"], "auth_failure");
    }

    #[tokio::test(start_paused = true)]
    async fn double_timeout_maps_to_504() {
        let req = post("/v1/reply", json!({ "profile": profile(), "message": "hello" }));

        let response = app(Outcome::Hang).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        let body = body_json(response).await;
        assert_eq!(body["error"]["kind"], "upstream_timeout");
        assert_eq!(body["error"]["retryable"], true);
    }

    #[tokio::test]
    async fn invalidate_evicts_cached_entries() {
        let app = app(Outcome::Reply("Open 9 to 5"));

        let req = post("/v1/reply", json!({ "profile": profile(), "message": "hours?" }));
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let req = post("/v1/bots/bot-1/invalidate", json!({}));
        let response = app.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["botId"], "bot-1");
        assert_eq!(body["evicted"], 2, "one knowledge entry and one prompt");

        let req = post("/v1/bots/bot-1/invalidate", json!({}));
        let body = body_json(app.oneshot(req).await.unwrap()).await;
        assert_eq!(body["evicted"], 0);
    }

    #[tokio::test]
    async fn preview_reports_section_usage() {
        let req = post("/v1/knowledge/preview", json!({ "profile": profile() }));

        let response = app(Outcome::Reply("unused")).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["botId"], "bot-1");
        assert_eq!(body["truncated"], false);
        assert_eq!(body["placeholder"], false);
        assert!(body["usage"]["faq"].as_u64().unwrap() > 0);
        assert_eq!(body["usage"]["documents"], 0);
        assert!(
            body["text"]
                .as_str()
                .unwrap()
                .contains("Q: What are your hours?\nA: 9am to 5pm, Monday to Friday")
        );
    }

    #[tokio::test]
    async fn preview_of_empty_profile_is_placeholder() {
        let empty = json!({ "id": "bot-2", "name": "Empty", "updatedAt": "2026-01-02T03:04:05Z" });
        let req = post("/v1/knowledge/preview", json!({ "profile": empty, "maxLength": 500 }));

        let body = body_json(app(Outcome::Reply("unused")).oneshot(req).await.unwrap()).await;
        assert_eq!(body["placeholder"], true);
        assert_eq!(
            body["text"],
            chatwright_engine::knowledge::NO_KNOWLEDGE_PLACEHOLDER
        );
    }

    #[tokio::test]
    async fn preview_rejects_zero_budget() {
        let req = post(
            "/v1/knowledge/preview",
            json!({ "profile": profile(), "maxLength": 0 }),
        );

        let response = app(Outcome::Reply("unused")).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn cache_stats_lists_every_cache() {
        let app = app(Outcome::Reply("Open 9 to 5"));

        let req = post("/v1/reply", json!({ "profile": profile(), "message": "hours?" }));
        app.clone().oneshot(req).await.unwrap();

        let req = Request::builder()
            .uri("/v1/cache/stats")
            .body(Body::empty())
            .unwrap();
        let body = body_json(app.oneshot(req).await.unwrap()).await;

        let names: Vec<&str> = body["caches"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["knowledge", "prompt", "quote"]);
        assert_eq!(body["caches"][0]["entries"], 1);
        assert_eq!(body["caches"][1]["misses"], 1);
    }

    #[test]
    fn error_status_mapping() {
        assert_eq!(
            status_for(&GenerationError::Validation("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&GenerationError::UnknownUpstream("x".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&GenerationError::UpstreamTimeout {
                attempts: 2,
                timeout_secs: 20
            }),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn build_generator_from_default_config() {
        let generator = build_generator(&AppConfig::default()).unwrap();
        assert_eq!(generator.cache().stats().len(), 3);
    }
}
