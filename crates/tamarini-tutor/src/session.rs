//! Client-side conversation state machine.
//!
//! A [`Session`] owns one conversation, the draft input, the pending image,
//! and the user's [`Settings`]. It moves between two states:
//!
//! - `Idle` -> `Sending` on an accepted [`Session::submit`]
//! - `Sending` -> `Idle` on [`Session::complete`], which appends either the
//!   reply or the localized apology
//!
//! Submits and new-exercise resets are rejected while `Sending`. Only one
//! request can be in flight per session.
//!
//! [`run_turn`] drives a full turn against any [`TutorBackend`]. It holds the
//! session lock only while mutating, never across the backend call. A turn
//! whose future is dropped before the reply is applied is abandoned: the
//! session still returns to `Idle` with the apology.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{Language, Settings, Theme};
use crate::error::{Result, TutorError};
use crate::image::ImagePayload;
use crate::locale::strings;
use crate::mode::Mode;
use crate::transcript::{Message, MessageId, Role};
use crate::tutor::{TutorBackend, TutorRequest};

// ============================================================================
// SessionStatus
// ============================================================================

/// Whether a reply is currently being generated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Waiting for the student.
    #[default]
    Idle,
    /// A request is in flight.
    Sending,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Sending => write!(f, "sending"),
        }
    }
}

// ============================================================================
// Submission
// ============================================================================

/// Identifies one in-flight request of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// An accepted submit: the request to send and the ticket to complete it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Ticket to pass back to [`Session::complete`].
    pub ticket: Ticket,
    /// Snapshot of the conversation, image, language, and mode at submit time.
    pub request: TutorRequest,
}

// ============================================================================
// Session
// ============================================================================

/// One student's conversation with the tutor.
#[derive(Debug, Clone)]
pub struct Session {
    messages: Vec<Message>,
    status: SessionStatus,
    settings: Settings,
    draft: String,
    pending_image: Option<ImagePayload>,
    next_message_id: u64,
    next_ticket: u64,
    in_flight: Option<Ticket>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl Session {
    /// Creates an idle session holding only the greeting.
    ///
    /// # Examples
    ///
    /// ```
    /// use tamarini_tutor::{Role, Session, SessionStatus, Settings};
    ///
    /// let session = Session::new(Settings::default());
    /// assert_eq!(session.status(), SessionStatus::Idle);
    /// assert_eq!(session.messages().len(), 1);
    /// assert_eq!(session.messages()[0].role, Role::Tutor);
    /// ```
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        let mut session = Self {
            messages: Vec::new(),
            status: SessionStatus::Idle,
            settings,
            draft: String::new(),
            pending_image: None,
            next_message_id: 1,
            next_ticket: 1,
            in_flight: None,
        };
        session.reset_conversation();
        session
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// The conversation, oldest first. Never empty; the first entry is the
    /// tutor greeting.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Current state.
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// Returns `true` while a request is in flight.
    #[must_use]
    pub const fn is_sending(&self) -> bool {
        matches!(self.status, SessionStatus::Sending)
    }

    /// Active settings.
    #[must_use]
    pub const fn settings(&self) -> Settings {
        self.settings
    }

    /// Active language.
    #[must_use]
    pub const fn language(&self) -> Language {
        self.settings.language
    }

    /// Text typed but not yet sent.
    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Image waiting to be sent with the next submit.
    #[must_use]
    pub const fn pending_image(&self) -> Option<&ImagePayload> {
        self.pending_image.as_ref()
    }

    // ------------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------------

    /// Replaces the draft text.
    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Sets the image for the next submit, replacing any previous one.
    pub fn attach_image(&mut self, image: ImagePayload) {
        if self.pending_image.is_some() {
            debug!("Replacing pending image");
        }
        self.pending_image = Some(image);
    }

    /// Drops the pending image.
    pub fn clear_image(&mut self) {
        self.pending_image = None;
    }

    // ------------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------------

    /// `Idle -> Sending`: appends the student turn and returns the request.
    ///
    /// The student text is resolved as follows:
    /// - `similar-exercise`: always the localized "similar exercise" request;
    ///   the draft is kept.
    /// - otherwise the trimmed draft, or the localized "here is my exercise"
    ///   text when only an image is attached; the draft is cleared.
    ///
    /// The pending image moves into the request.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::SessionBusy` while `Sending`, and
    /// `TutorError::Validation` when there is neither text nor image (outside
    /// `similar-exercise`). Neither error changes the session.
    pub fn submit(&mut self, mode: Mode) -> Result<Submission> {
        if self.is_sending() {
            warn!("Submit ignored: a reply is already being generated");
            return Err(TutorError::SessionBusy);
        }

        let text = self.resolve_student_text(mode)?;
        if mode != Mode::SimilarExercise {
            self.draft.clear();
        }

        let image = self.pending_image.take();
        let message = self
            .new_message(Role::Student, text)
            .with_image(image.as_ref().map(ImagePayload::reference));
        self.messages.push(message);

        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.in_flight = Some(ticket);
        self.status = SessionStatus::Sending;

        info!(
            %mode,
            language = %self.settings.language,
            messages = self.messages.len(),
            has_image = image.is_some(),
            "Student turn submitted"
        );

        Ok(Submission {
            ticket,
            request: TutorRequest {
                messages: self.messages.clone(),
                image,
                language: self.settings.language,
                mode,
            },
        })
    }

    /// `Sending -> Idle`: appends the reply, or the apology on failure.
    ///
    /// The error itself is never shown; only the localized apology is.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::InvalidStateTransition` if `ticket` is not the
    /// request currently in flight. The outcome is discarded in that case.
    pub fn complete(&mut self, ticket: Ticket, outcome: Result<String>) -> Result<&Message> {
        if self.in_flight != Some(ticket) {
            warn!(?ticket, "Discarding completion for a request that is not in flight");
            return Err(TutorError::invalid_transition(self.status, SessionStatus::Idle));
        }

        let text = match outcome {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Tutor reply failed; showing apology");
                strings(self.settings.language).apology.to_string()
            }
        };

        let message = self.new_message(Role::Tutor, text);
        self.messages.push(message);
        self.in_flight = None;
        self.status = SessionStatus::Idle;

        self.messages
            .last()
            .ok_or_else(|| TutorError::invalid_transition(SessionStatus::Sending, self.status))
    }

    /// `Sending -> Idle` for a request whose reply will never be applied.
    ///
    /// Appends the apology, exactly as a failed reply would.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::InvalidStateTransition` if `ticket` is not the
    /// request currently in flight.
    pub fn abandon(&mut self, ticket: Ticket) -> Result<&Message> {
        self.complete(ticket, Err(TutorError::TurnAbandoned))
    }

    /// Returns `true` if [`Session::submit`] would accept a turn in `mode`.
    #[must_use]
    pub fn can_submit(&self, mode: Mode) -> bool {
        !self.is_sending() && self.resolve_student_text(mode).is_ok()
    }

    /// Switches language. Allowed in any state; does not touch the request
    /// in flight.
    ///
    /// The greeting at the head of the conversation is rewritten in the new
    /// language; every other message is left as it was.
    pub fn set_language(&mut self, language: Language) {
        self.settings.language = language;
        if let Some(first) = self.messages.first_mut() {
            if first.role == Role::Tutor {
                first.text = strings(language).greeting.to_string();
            }
        }
    }

    /// Switches theme.
    pub fn set_theme(&mut self, theme: Theme) {
        self.settings.theme = theme;
    }

    /// Starts over with a fresh greeting, clearing the draft and pending image.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::SessionBusy` while `Sending`.
    pub fn new_exercise(&mut self) -> Result<()> {
        if self.is_sending() {
            return Err(TutorError::SessionBusy);
        }
        self.reset_conversation();
        self.draft.clear();
        self.pending_image = None;
        info!("Started a new exercise");
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn resolve_student_text(&self, mode: Mode) -> Result<String> {
        let text = strings(self.settings.language);
        if mode == Mode::SimilarExercise {
            return Ok(text.similar_request.to_string());
        }

        let draft = self.draft.trim();
        if !draft.is_empty() {
            Ok(draft.to_string())
        } else if self.pending_image.is_some() {
            Ok(text.image_only_request.to_string())
        } else {
            Err(TutorError::validation("Nothing to send"))
        }
    }

    fn reset_conversation(&mut self) {
        let greeting = strings(self.settings.language).greeting;
        let message = self.new_message(Role::Tutor, greeting);
        self.messages = vec![message];
    }

    fn new_message(&mut self, role: Role, text: impl Into<String>) -> Message {
        let id = MessageId(self.next_message_id);
        self.next_message_id += 1;
        Message::new(id, role, text)
    }
}

// ============================================================================
// Driver
// ============================================================================

/// Runs one full turn: submit, call the backend, apply the outcome.
///
/// The lock is released while the backend works, so language changes stay
/// responsive and overlapping submits are rejected with `SessionBusy`.
///
/// If this future is dropped before the outcome is applied (a timeout, a
/// `select!` branch losing, an aborted task), the turn is abandoned and the
/// session goes back to `Idle` with the apology.
///
/// # Errors
///
/// Returns the submit error if the turn was not accepted. Backend failures
/// are not errors here: they become the apology message.
pub async fn run_turn(
    session: &Arc<Mutex<Session>>,
    backend: &dyn TutorBackend,
    mode: Mode,
) -> Result<Message> {
    let Submission { ticket, request } = session.lock().await.submit(mode)?;
    let mut pending = PendingTurn {
        session,
        ticket: Some(ticket),
    };

    let outcome = backend.reply(&request).await;

    let mut guard = session.lock().await;
    pending.disarm();
    guard.complete(ticket, outcome).cloned()
}

/// Abandons its ticket on drop unless the turn was completed.
struct PendingTurn<'a> {
    session: &'a Arc<Mutex<Session>>,
    ticket: Option<Ticket>,
}

impl PendingTurn<'_> {
    fn disarm(&mut self) {
        self.ticket = None;
    }
}

impl Drop for PendingTurn<'_> {
    fn drop(&mut self) {
        let Some(ticket) = self.ticket.take() else {
            return;
        };
        warn!(?ticket, "Turn dropped before its reply was applied; abandoning");

        if let Ok(mut session) = self.session.try_lock() {
            let _ = session.abandon(ticket);
            return;
        }

        // Someone else holds the lock right now; finish the abandon later.
        let session = Arc::clone(self.session);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let _ = session.lock().await.abandon(ticket);
                });
            }
            Err(e) => warn!(error = %e, ?ticket, "No runtime to abandon the turn on"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
