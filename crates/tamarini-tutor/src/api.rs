//! HTTP API endpoint for the TAMARINI tutor.
//!
//! A single stateless endpoint: the client sends the whole conversation with
//! every request and receives one reply.
//!
//! # Endpoints
//!
//! - `POST /api/tamarini` - Generate the next tutor message
//!
//! Any other method on that path answers `405` with `Allow: POST`.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tamarini_tutor::{create_router, AppState, Config, GeminiModel, Tutor};
//!
//! # async fn example() -> tamarini_tutor::Result<()> {
//! let config = Config::default();
//! let tutor = Tutor::new(Arc::new(GeminiModel::from_config(&config)?));
//! let router = create_router(AppState::new(config, Arc::new(tutor)));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, router).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, error, info, warn};

use crate::error::TutorError;
use crate::tutor::TutorBackend;
use crate::wire::{ChatRequest, ChatResponse, ErrorResponse};
use crate::Config;

/// Message returned to callers when generation fails.
pub const GENERATION_FAILED_MESSAGE: &str = "AI error (see server logs)";

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the HTTP server.
///
/// Holds no per-conversation data: every request carries its own history,
/// language, and mode.
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the endpoint.
    pub config: Config,
    /// Pipeline that produces replies.
    pub tutor: Arc<dyn TutorBackend>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Creates a new `AppState`.
    #[must_use]
    pub fn new(config: Config, tutor: Arc<dyn TutorBackend>) -> Self {
        Self { config, tutor }
    }
}

// ============================================================================
// API Error Type
// ============================================================================

/// Error wrapper that renders a [`TutorError`] as an HTTP response.
#[derive(Debug)]
struct ApiError(TutorError);

impl From<TutorError> for ApiError {
    fn from(err: TutorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.0.is_client_error() {
            debug!(error = %self.0, "Rejected request");
        } else {
            error!(error = %self.0, "Tutor request failed");
        }

        let (status, message) = match self.0 {
            TutorError::Validation { message } => (StatusCode::BAD_REQUEST, message),
            err @ TutorError::RequestTooLarge { .. } => {
                (StatusCode::PAYLOAD_TOO_LARGE, err.to_string())
            }
            TutorError::UnsupportedMethod { .. } => {
                let body = Json(ErrorResponse {
                    error: "Method Not Allowed".to_string(),
                });
                return (
                    StatusCode::METHOD_NOT_ALLOWED,
                    [(header::ALLOW, "POST")],
                    body,
                )
                    .into_response();
            }
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                GENERATION_FAILED_MESSAGE.to_string(),
            ),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router with the tutor endpoint.
///
/// The returned router has:
/// - the endpoint at `config.endpoint_path`
/// - a body limit of `config.max_request_bytes`
/// - CORS middleware (the mobile and web clients are on other origins)
/// - tracing middleware for request logging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let path = state.config.endpoint_path.clone();
    let body_limit = state.config.max_request_bytes;

    Router::new()
        .route(&path, post(handle_chat).fallback(handle_wrong_method))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler for `POST /api/tamarini`.
async fn handle_chat(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let body = body.map_err(|rejection| {
        warn!(
            status = %rejection.status(),
            error = %rejection.body_text(),
            "Rejecting request body"
        );
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            TutorError::request_too_large(state.config.max_request_bytes)
        } else {
            TutorError::validation(rejection.body_text())
        }
    })?;

    let request: ChatRequest = if body.is_empty() {
        ChatRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            warn!(error = %e, "Rejecting malformed request body");
            TutorError::validation(format!("Invalid JSON body: {e}"))
        })?
    };

    let request = request.into_tutor_request(state.config.default_language)?;

    info!(
        mode = %request.mode,
        language = %request.language,
        messages = request.messages.len(),
        has_image = request.image.is_some(),
        "Received tutor request"
    );

    let reply = state.tutor.reply(&request).await?;

    info!(reply_len = reply.len(), "Tutor reply sent");

    Ok(Json(ChatResponse { reply }))
}

/// Fallback for every method other than `POST`.
async fn handle_wrong_method(method: Method) -> ApiError {
    warn!(%method, "Method not allowed");
    TutorError::unsupported_method(method.as_str()).into()
}

// ============================================================================
// Tests
// ============================================================================
