//! Axum-based API gateway: HTTP boundary for the Haven chat pipeline.
//! Config-driven via CoreConfig; the pipeline itself never reads the
//! environment.

use axum::extract::{ConnectInfo, Json, Request, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use haven_core::{
    assess_birth_year, ChatOutcome, ChatPipeline, ChatRequest, ChatTurn, CoreConfig,
    ModelProvider, PassageStore, PipelineError, SafetyPolicy,
};
use haven_provider::{MockProvider, OpenAiProvider};
use chrono::Datelike;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod limit;
use limit::RateLimiter;

const GENERIC_PROVIDER_ERROR: &str =
    "The assistant is temporarily unavailable. Please try again in a moment.";

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[haven-gateway] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(CoreConfig::load().expect("load CoreConfig"));

    let provider = build_provider(&config);
    let passages = open_passage_store(&config);
    let policy = SafetyPolicy::with_overrides(&config.trusted_domains, &config.crisis_phrases);
    let pipeline = Arc::new(ChatPipeline::new(
        provider,
        passages,
        policy,
        config.default_params(),
    ));

    let port = config.port;
    let app_name = config.app_name.clone();
    let limiter = Arc::new(RateLimiter::new(config.rate_limit_per_minute));
    let app = build_app(AppState {
        config: Arc::clone(&config),
        pipeline,
        limiter,
    });

    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!("{} listening on {}", app_name, addr);
    axum::serve(
        tokio::net::TcpListener::bind(addr).await.expect("bind gateway port"),
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .expect("serve gateway");
}

/// Provider per `llm_mode`: "live" requires an API key in `HAVEN_LLM_API_KEY`
/// or `OPENAI_API_KEY`; without one the gateway degrades to mock mode so it
/// still answers.
fn build_provider(config: &CoreConfig) -> Arc<dyn ModelProvider> {
    if config.llm_mode == "live" {
        let key = std::env::var("HAVEN_LLM_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        match key {
            Some(key) => {
                tracing::info!("LLM mode: live ({})", config.llm_api_url);
                return Arc::new(OpenAiProvider::new(config.llm_api_url.clone(), key));
            }
            None => {
                tracing::warn!("llm_mode is \"live\" but no API key is set; falling back to mock");
            }
        }
    }
    tracing::info!("LLM mode: mock");
    Arc::new(MockProvider::new())
}

/// Best-effort store open. A locked or corrupt store means chat runs
/// without retrieval, not that the gateway fails to start.
fn open_passage_store(config: &CoreConfig) -> Option<Arc<PassageStore>> {
    let path = Path::new(&config.storage_path).join("haven_passages");
    match PassageStore::open_path(&path) {
        Ok(store) => {
            tracing::info!("Passage store open ({} passages)", store.len());
            Some(Arc::new(store))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Passage store unavailable; continuing without retrieval");
            None
        }
    }
}

#[derive(Clone)]
struct AppState {
    config: Arc<CoreConfig>,
    pipeline: Arc<ChatPipeline>,
    limiter: Arc<RateLimiter>,
}

fn build_app(state: AppState) -> Router {
    // Exact-origin allow list, as the deployment locks CORS to its site.
    let mut allowed: Vec<String> = state.config.allowed_origins.clone();
    if allowed.is_empty() {
        allowed.push("http://localhost:3000".to_string());
    }
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin
                .to_str()
                .map(|o| allowed.iter().any(|a| a == o))
                .unwrap_or(false)
        }))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    Router::new()
        .route("/api/v1/chat", post(chat))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            enforce_chat_budget,
        ))
        .route("/api/v1/health", get(health))
        .route("/api/v1/age-check", post(age_check))
        .with_state(state)
        .layer(cors)
}

/// Per-client budget check ahead of the chat handler. The client key is the
/// first `x-forwarded-for` hop when present (the gateway sits behind a
/// proxy in deployment), else the peer address.
async fn enforce_chat_budget(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let key = client_key(&req);
    if state.limiter.try_acquire(&key) {
        next.run(req).await
    } else {
        tracing::warn!(client = %key, "chat request over per-minute budget");
        (
            StatusCode::TOO_MANY_REQUESTS,
            axum::Json(serde_json::json!({
                "ok": false,
                "type": "rate_limited",
                "error": "Too many requests. Please wait a moment and try again.",
            })),
        )
            .into_response()
    }
}

fn client_key(req: &Request) -> String {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(addr) = forwarded {
        return addr.to_string();
    }
    req.extensions()
        .get::<ConnectInfo<std::net::SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// GET /api/v1/health – liveness check for the hosting platform.
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "ok": true,
        "ts": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Chat request body. Accepts either a bare `message` string or a
/// `messages` history; the string form wraps into a one-element history.
#[derive(serde::Deserialize)]
struct ChatApiRequest {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    messages: Vec<ChatTurn>,
    #[serde(default)]
    birth_year: Option<i32>,
    /// Optional system-prompt override.
    #[serde(default)]
    system: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default)]
    max_tokens: Option<u32>,
}

impl ChatApiRequest {
    fn into_core(self) -> ChatRequest {
        let messages = if !self.messages.is_empty() {
            self.messages
        } else if let Some(message) = self.message {
            vec![ChatTurn::user(message)]
        } else {
            Vec::new()
        };
        ChatRequest {
            messages,
            birth_year: self.birth_year,
            system_override: self.system,
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// POST /api/v1/chat – runs the safety pipeline and proxies to the model.
async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatApiRequest>,
) -> (StatusCode, axum::Json<serde_json::Value>) {
    let core_req = req.into_core();
    match state.pipeline.handle(&core_req).await {
        Ok(ChatOutcome::Reply(reply)) => (
            StatusCode::OK,
            axum::Json(serde_json::json!({
                "ok": true,
                "model": reply.model,
                "reply": reply.text,
                "citations": reply.citations,
            })),
        ),
        Ok(ChatOutcome::Crisis { message }) => (
            StatusCode::OK,
            axum::Json(serde_json::json!({
                "ok": true,
                "crisis": true,
                "reply": message,
            })),
        ),
        Ok(ChatOutcome::Ineligible { message }) => (
            StatusCode::OK,
            axum::Json(serde_json::json!({
                "ok": true,
                "eligible": false,
                "reply": message,
            })),
        ),
        Err(e) => error_response(&state, e),
    }
}

/// Maps a pipeline failure to the single error shape
/// `{ ok: false, type, error }` with the matching status code.
fn error_response(
    state: &AppState,
    err: PipelineError,
) -> (StatusCode, axum::Json<serde_json::Value>) {
    match err {
        PipelineError::Validation(message) => (
            StatusCode::BAD_REQUEST,
            axum::Json(serde_json::json!({
                "ok": false,
                "type": "validation_error",
                "error": message,
            })),
        ),
        PipelineError::Provider(p) => {
            tracing::error!(status = p.status, "Model provider call failed: {}", p.message);
            let (status, kind) = if p.is_rate_limited() {
                (StatusCode::TOO_MANY_REQUESTS, "rate_limited")
            } else {
                (StatusCode::INTERNAL_SERVER_ERROR, "provider_error")
            };
            let detail = if state.config.production {
                GENERIC_PROVIDER_ERROR.to_string()
            } else {
                p.message
            };
            (
                status,
                axum::Json(serde_json::json!({
                    "ok": false,
                    "type": kind,
                    "error": detail,
                })),
            )
        }
    }
}

#[derive(serde::Deserialize)]
struct AgeCheckRequest {
    birth_year: i32,
}

/// POST /api/v1/age-check – standalone eligibility probe for onboarding UIs.
async fn age_check(
    State(state): State<AppState>,
    Json(req): Json<AgeCheckRequest>,
) -> (StatusCode, axum::Json<serde_json::Value>) {
    let current_year = chrono::Utc::now().year();
    match assess_birth_year(
        req.birth_year,
        current_year,
        &state.pipeline.policy().ineligible_message,
    ) {
        Ok(result) => (
            StatusCode::OK,
            axum::Json(serde_json::json!({
                "ok": true,
                "eligible": result.eligible,
                "message": result.message,
            })),
        ),
        Err(e) => error_response(&state, e),
    }
}
