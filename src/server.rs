use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use tracing::{error, info, warn};

use crate::AppState;
use crate::assistant::{AssistantApi, OpenAiAssistantClient};
use crate::chat::ChatService;
use crate::config::{AppConfig, StoreProvider};
use crate::error::ChatError;
use crate::store::{
    RecordStore,
    providers::{AirtableStore, MemoryRecordStore},
};

/// Body returned for every failure that is not the caller's fault.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Build shared state from configuration: assistant client, record store and
/// chat service, constructed once and never mutated.
pub fn build_state(config: Arc<AppConfig>) -> anyhow::Result<AppState> {
    let settings = config.assistant_settings();
    info!(
        name: "assistant.config.loaded",
        base_url = %settings.base_url,
        provider = ?settings.provider,
        assistant_id = %settings.assistant_id,
        "Assistant configuration loaded"
    );
    let assistant: Arc<dyn AssistantApi> = Arc::new(OpenAiAssistantClient::new(settings));

    let store: Arc<dyn RecordStore> = match config.store.provider {
        StoreProvider::Airtable => Arc::new(AirtableStore::new(
            &config.store.endpoint_url,
            config.store.api_key.clone(),
            config.store.base_id.clone(),
        )?),
        StoreProvider::Memory => {
            warn!("Using in-memory record store; conversations are lost on restart");
            Arc::new(MemoryRecordStore::new())
        }
    };
    info!(
        name: "store.config.loaded",
        provider = ?config.store.provider,
        table = %config.store.table,
        "Record store configured"
    );

    let chat = Arc::new(ChatService::new(assistant, store, config.chat_options()));
    Ok(AppState { chat, config })
}

/// Application routes.
pub fn router(state: AppState) -> Router {
    let static_dir = ServeDir::new(&state.config.server.static_dir);

    Router::new()
        .route("/chat", post(api_chat))
        .route("/health", get(health))
        .fallback_service(static_dir)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let state = build_state(Arc::clone(&config))?;
    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(name: "server.stopped", "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Request body for chat API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// User message content.
    #[serde(default)]
    pub message: Option<String>,
    /// Client-generated session identifier.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Response from chat API.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Concatenated assistant text.
    pub response: String,
}

/// Error body for 4xx/5xx responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Failure modes of the HTTP surface.
#[derive(Debug)]
pub enum ApiError {
    /// 400 with a message describing what the caller got wrong.
    BadRequest(String),
    /// 500 with no detail.
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_ERROR_MESSAGE.to_string(),
            ),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        if err.is_client_error() {
            Self::BadRequest(err.to_string())
        } else {
            Self::Internal
        }
    }
}

/// POST /chat - Relay a message to the assistant and return its reply.
async fn api_chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = payload.map_err(|rejection| {
        warn!(error = %rejection, "Rejected chat request body");
        ApiError::BadRequest(rejection.body_text())
    })?;

    info!(
        session_id = ?req.session_id,
        message_len = req.message.as_deref().map_or(0, str::len),
        "Received chat request"
    );

    let outcome = state
        .chat
        .handle_chat(req.message.as_deref(), req.session_id.as_deref())
        .await
        .map_err(|err| {
            if !err.is_client_error() {
                error!(
                    name: "chat.failed",
                    session_id = ?req.session_id,
                    error = %err,
                    "Error processing chat"
                );
            }
            ApiError::from(err)
        })?;

    Ok(Json(ChatResponse {
        response: outcome.response,
    }))
}

/// GET /health - Liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
