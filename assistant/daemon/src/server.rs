//! Daemon Route Implementation
//!
//! HTTP surface over the core library:
//!
//! - `POST /api/v1/ai/chat` — assistant chat relay. Accepts the client's
//!   conversation as wire messages, prepends the variant's system
//!   instructions, sanitizes, and forwards to the model provider. The
//!   fail-soft contract holds here too: provider failures come back as
//!   HTTP 200 with the apology text so clients render a normal turn.
//! - `GET|POST /api/v1/schedule` — school-system aggregation proxy,
//!   gated by an `edu_`-prefixed bearer key.
//! - `GET /health` — liveness probe.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use eduport_core::{
    sanitize_messages, system_prompt, ChatBackend, CompletionRequest, Credentials, ModelVariant,
    OpenAiBackend, OrchestratorConfig, SchoolClient, WireMessage, WireRole, APOLOGY,
};

/// Required prefix of schedule-proxy API keys
const API_KEY_PREFIX: &str = "edu_";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    backend: Arc<OpenAiBackend>,
    school: Arc<SchoolClient>,
    config: OrchestratorConfig,
}

impl AppState {
    /// Assemble state from environment variables
    pub fn from_env() -> Self {
        Self {
            backend: Arc::new(OpenAiBackend::from_env()),
            school: Arc::new(SchoolClient::from_env()),
            config: OrchestratorConfig::from_env(),
        }
    }

    /// The model backend (for startup health checks)
    pub fn backend(&self) -> &OpenAiBackend {
        &self.backend
    }
}

/// Build the daemon router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/ai/chat", post(chat))
        .route("/api/v1/schedule", get(schedule_get).post(schedule_post))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

// ---------------------------------------------------------------------------
// Chat relay
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChatPayload {
    messages: Vec<WireMessage>,
    #[serde(rename = "modelType", default)]
    model_type: ModelVariant,
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatPayload>, JsonRejection>,
) -> Response {
    let Ok(Json(payload)) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "request must carry a message array"})),
        )
            .into_response();
    };

    let variant = payload.model_type;
    debug!(
        variant = ?variant,
        messages = payload.messages.len(),
        "chat relay request"
    );

    let mut messages = Vec::with_capacity(payload.messages.len() + 1);
    messages.push(WireMessage::text(WireRole::System, system_prompt(variant)));
    messages.extend(payload.messages);
    let messages = sanitize_messages(messages);

    let request = CompletionRequest::new(state.config.model_for(variant), messages)
        .with_max_tokens(state.config.max_tokens)
        .with_temperature(state.config.temperature);

    match state.backend.complete(&request).await {
        Ok(response) => Json(json!({"content": response.content})).into_response(),
        Err(e) => {
            warn!(error = %e, "model request failed, substituting apology");
            Json(json!({"content": APOLOGY})).into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Schedule proxy
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct ScheduleQuery {
    login: Option<String>,
    password: Option<String>,
    term: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ScheduleBody {
    /// National id, accepted as an alias for `login`
    iin: Option<String>,
    login: Option<String>,
    password: Option<String>,
    term: Option<String>,
}

/// Extract the bearer token from the Authorization header
fn bearer_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Check the schedule-proxy key; `Err` carries the ready 401 response
fn check_api_key(headers: &HeaderMap) -> Result<(), Response> {
    let Some(key) = bearer_key(headers) else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Missing API key"})),
        )
            .into_response());
    };
    if !key.starts_with(API_KEY_PREFIX) {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Invalid API key"})),
        )
            .into_response());
    }
    Ok(())
}

/// Pick the effective login, treating empty strings as absent
fn resolve_credential(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    primary
        .filter(|s| !s.is_empty())
        .or_else(|| fallback.filter(|s| !s.is_empty()))
}

async fn schedule_get(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ScheduleQuery>,
) -> Response {
    if let Err(response) = check_api_key(&headers) {
        return response;
    }
    run_schedule(
        &state,
        resolve_credential(query.login, None),
        resolve_credential(query.password, None),
        query.term,
    )
    .await
}

async fn schedule_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ScheduleBody>, JsonRejection>,
) -> Response {
    if let Err(response) = check_api_key(&headers) {
        return response;
    }
    let Ok(Json(body)) = body else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Invalid request body"})),
        )
            .into_response();
    };
    run_schedule(
        &state,
        resolve_credential(body.iin, body.login),
        resolve_credential(body.password, None),
        body.term,
    )
    .await
}

async fn run_schedule(
    state: &AppState,
    login: Option<String>,
    password: Option<String>,
    term: Option<String>,
) -> Response {
    let (Some(login), Some(password)) = (login, password) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Login credentials are required"})),
        )
            .into_response();
    };

    let credentials = Credentials { login, password };
    match state.school.fetch_report(&credentials, term.as_deref()).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            let status = StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(json!({"error": e.to_string()}))).into_response()
        }
    }
}
