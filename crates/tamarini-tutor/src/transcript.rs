//! Conversation messages and their plain-text transcript.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::image::ImageRef;

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The learner.
    Student,
    /// TAMARINI.
    Tutor,
}

impl Role {
    /// Label used for this role in the transcript.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Student => "Student",
            Self::Tutor => "Tutor",
        }
    }
}

/// Opaque message identifier, unique within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// One turn of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier of this message.
    pub id: MessageId,
    /// Author of the message.
    pub role: Role,
    /// Message text.
    pub text: String,
    /// Image that was sent along with this message, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached_image: Option<ImageRef>,
    /// When the message was created.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Creates a message with the current timestamp.
    #[must_use]
    pub fn new(id: MessageId, role: Role, text: impl Into<String>) -> Self {
        Self {
            id,
            role,
            text: text.into(),
            attached_image: None,
            created_at: Utc::now(),
        }
    }

    /// Attaches an image reference.
    #[must_use]
    pub fn with_image(mut self, image: Option<ImageRef>) -> Self {
        self.attached_image = image;
        self
    }
}

/// Renders messages as `"<Role>: <text>\n"` lines, in order.
///
/// Nothing is truncated, merged, or dropped.
///
/// # Examples
///
/// ```
/// use tamarini_tutor::{format_transcript, Message, MessageId, Role};
///
/// let messages = vec![
///     Message::new(MessageId(1), Role::Tutor, "Hi"),
///     Message::new(MessageId(2), Role::Student, "2+2=4"),
/// ];
/// assert_eq!(format_transcript(&messages), "Tutor: Hi\nStudent: 2+2=4\n");
/// ```
#[must_use]
pub fn format_transcript(messages: &[Message]) -> String {
    messages.iter().fold(String::new(), |mut out, message| {
        out.push_str(message.role.label());
        out.push_str(": ");
        out.push_str(&message.text);
        out.push('\n');
        out
    })
}
