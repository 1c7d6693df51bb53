//! The tutoring pipeline: format → select instructions → assemble → complete.
//!
//! [`Tutor`] is stateless. Every call receives the whole conversation plus
//! the language and mode for that one request, so any number of sessions
//! can share one instance.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::completion::{CompletionClient, GenerativeModel};
use crate::config::Language;
use crate::error::Result;
use crate::image::ImagePayload;
use crate::mode::{select_instructions, Mode};
use crate::prompt::{assemble, PromptPart};
use crate::transcript::{format_transcript, Message};

/// Everything needed to produce one tutor reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorRequest {
    /// Conversation so far, oldest first, including the latest student turn.
    pub messages: Vec<Message>,
    /// Image sent with the latest student turn.
    pub image: Option<ImagePayload>,
    /// Language the reply must be written in.
    pub language: Language,
    /// Behavioural contract for this reply.
    pub mode: Mode,
}

impl TutorRequest {
    /// Builds the ordered prompt parts for this request.
    ///
    /// Pure: no I/O, no hidden inputs.
    #[must_use]
    pub fn prompt(&self) -> Vec<PromptPart> {
        let transcript = format_transcript(&self.messages);
        let instructions = select_instructions(self.mode, self.language);
        assemble(&instructions, &transcript, self.image.as_ref())
    }
}

/// Anything that can answer a [`TutorRequest`] with one reply.
///
/// Implemented in-process by [`Tutor`] and remotely by
/// [`HttpTutorClient`](crate::HttpTutorClient).
#[async_trait]
pub trait TutorBackend: Send + Sync {
    /// Produces the next tutor message.
    async fn reply(&self, request: &TutorRequest) -> Result<String>;
}

/// In-process tutoring pipeline around a generative model.
#[derive(Debug, Clone)]
pub struct Tutor {
    completion: CompletionClient,
}

impl Tutor {
    /// Creates a tutor backed by the given model.
    #[must_use]
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self {
            completion: CompletionClient::new(model),
        }
    }
}

#[async_trait]
impl TutorBackend for Tutor {
    async fn reply(&self, request: &TutorRequest) -> Result<String> {
        info!(
            mode = %request.mode,
            language = %request.language,
            messages = request.messages.len(),
            has_image = request.image.is_some(),
            "Generating tutor reply"
        );

        let parts = request.prompt();
        debug!(parts = parts.len(), "Prompt assembled");

        self.completion.complete(&parts).await
    }
}
