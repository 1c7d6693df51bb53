//! TAMARINI tutoring core
//!
//! Turns a conversation, an optional exercise photo, a language and a mode
//! into one short tutor reply, serves that over `POST /api/tamarini`, and
//! drives the client-side conversation state machine.

pub mod api;
pub mod client;
pub mod completion;
pub mod config;
pub mod error;
pub mod image;
pub mod locale;
pub mod mode;
pub mod prompt;
pub mod session;
pub mod transcript;
pub mod tutor;
pub mod wire;

pub use api::{create_router, AppState, GENERATION_FAILED_MESSAGE};
pub use client::HttpTutorClient;
pub use completion::{CompletionClient, GeminiModel, GenerativeModel};
pub use config::{Config, Language, Settings, Theme};
pub use error::{ModelErrorKind, Result, TutorError};
pub use image::{ImageFormat, ImagePayload, ImageRef, DEFAULT_IMAGE_MIME, MAX_IMAGE_SIZE};
pub use locale::{strings, Strings};
pub use mode::{select_instructions, Mode};
pub use prompt::{assemble, strip_data_uri_prefix, InlineData, PromptPart};
pub use session::{run_turn, Session, SessionStatus, Submission, Ticket};
pub use transcript::{format_transcript, Message, MessageId, Role};
pub use tutor::{Tutor, TutorBackend, TutorRequest};
pub use wire::{ChatRequest, ChatResponse, ErrorResponse, WireImage, WireMessage};
