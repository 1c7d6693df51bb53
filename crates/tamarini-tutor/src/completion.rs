//! The completion step: calling the generative model once and normalising
//! its outcome.
//!
//! [`GenerativeModel`] is the opaque external call. [`GeminiModel`] is the
//! production implementation. [`CompletionClient`] wraps any model and
//! enforces the reply-or-error contract: one attempt, no retries, and an
//! empty answer counts as a failure.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ModelErrorKind, Result, TutorError};
use crate::prompt::PromptPart;

/// A text- and image-conditioned completion service.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Generates a reply for the given ordered prompt parts.
    ///
    /// May return an empty string; [`CompletionClient`] treats that as a
    /// failure.
    async fn generate(&self, parts: &[PromptPart]) -> Result<String>;
}

/// Invokes a model once and classifies the result.
#[derive(Clone)]
pub struct CompletionClient {
    model: Arc<dyn GenerativeModel>,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("model", &self.model.name())
            .finish()
    }
}

impl CompletionClient {
    /// Creates a client around a model.
    #[must_use]
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// Runs one completion.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::EmptyReply` when the model answered with blank
    /// text, and `TutorError::GenerationFailed` for every other failure.
    pub async fn complete(&self, parts: &[PromptPart]) -> Result<String> {
        match self.model.generate(parts).await {
            Ok(text) if text.trim().is_empty() => {
                warn!(model = self.model.name(), "Model returned an empty reply");
                Err(TutorError::EmptyReply)
            }
            Ok(text) => {
                debug!(model = self.model.name(), reply_len = text.len(), "Completion succeeded");
                Ok(text)
            }
            Err(e @ (TutorError::GenerationFailed { .. } | TutorError::EmptyReply)) => {
                warn!(model = self.model.name(), error = %e, "Completion failed");
                Err(e)
            }
            Err(e) => {
                warn!(model = self.model.name(), error = %e, "Completion failed");
                Err(TutorError::generation_failed(ModelErrorKind::Other, e.to_string()))
            }
        }
    }
}

// ============================================================================
// Gemini
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: [RequestContent<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: &'a [PromptPart],
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate; empty when there is none.
    fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Google generative language API (`generateContent`).
#[derive(Clone)]
pub struct GeminiModel {
    client: reqwest::Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl std::fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiModel")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl GeminiModel {
    /// Creates a model client.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::GenerationFailed` if the HTTP client cannot be built.
    pub fn new(
        api_base: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TutorError::generation_failed(ModelErrorKind::Other, e.to_string()))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Creates a model client from server configuration and the environment.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::MissingApiKey` if the key variable is not set.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.api_base,
            &config.model,
            config.api_key()?,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.api_base, self.model)
    }
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, parts: &[PromptPart]) -> Result<String> {
        let body = GenerateContentRequest {
            contents: [RequestContent { role: "user", parts }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TutorError::generation_failed(ModelErrorKind::Network, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TutorError::generation_failed(
                ModelErrorKind::from_status(status.as_u16()),
                format!("HTTP {status}: {text}"),
            ));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| TutorError::generation_failed(ModelErrorKind::Other, e.to_string()))?;

        Ok(parsed.into_text())
    }
}
