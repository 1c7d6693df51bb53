//! Remote backend: calls a running tutor endpoint over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{ModelErrorKind, Result, TutorError};
use crate::tutor::{TutorBackend, TutorRequest};
use crate::wire::{ChatRequest, ChatResponse, ErrorResponse};

/// Default timeout for one round trip to the endpoint.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

/// [`TutorBackend`] that posts to `POST /api/tamarini` on a remote server.
#[derive(Debug, Clone)]
pub struct HttpTutorClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTutorClient {
    /// Creates a client for the given endpoint URL.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::GenerationFailed` if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    /// Creates a client with an explicit request timeout.
    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TutorError::generation_failed(ModelErrorKind::Other, e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// The endpoint URL this client posts to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl TutorBackend for HttpTutorClient {
    async fn reply(&self, request: &TutorRequest) -> Result<String> {
        let body = ChatRequest::from(request);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| TutorError::generation_failed(ModelErrorKind::Network, e.to_string()))?;

        let status = response.status();
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TutorError::generation_failed(ModelErrorKind::Network, e.to_string()))?;

        if !is_json {
            warn!(%status, "Endpoint did not return JSON");
            return Err(TutorError::generation_failed(
                ModelErrorKind::from_status(status.as_u16()),
                format!("HTTP {status}: server did not return JSON"),
            ));
        }

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorResponse>(&bytes)
                .map_or_else(|_| "No reply from server".to_string(), |e| e.error);
            warn!(%status, error = %message, "Endpoint returned an error");
            return Err(TutorError::generation_failed(
                ModelErrorKind::from_status(status.as_u16()),
                format!("HTTP {status}: {message}"),
            ));
        }

        let parsed: ChatResponse = serde_json::from_slice(&bytes)
            .map_err(|e| TutorError::generation_failed(ModelErrorKind::Other, e.to_string()))?;

        if parsed.reply.trim().is_empty() {
            return Err(TutorError::EmptyReply);
        }

        debug!(reply_len = parsed.reply.len(), "Received reply from endpoint");
        Ok(parsed.reply)
    }
}
