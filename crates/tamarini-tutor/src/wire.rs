//! JSON bodies of the tutor endpoint.
//!
//! The request shape is the one the mobile and web clients already send:
//!
//! ```json
//! {
//!   "messages": [{"sender": "assistant", "text": "Salut"}, {"sender": "user", "text": "3x=9"}],
//!   "image": {"base64": "data:image/jpeg;base64,...", "mimeType": "image/jpeg"},
//!   "language": "fr",
//!   "mode": "check-step"
//! }
//! ```
//!
//! Parsing is lenient wherever the clients are: unknown senders are
//! students, missing text is empty, and an image without data is ignored.
//! `sender`, `language` and `mode` of any JSON type are accepted; a value
//! that is not a string counts as unrecognised and takes the fallback.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::config::Language;
use crate::error::{Result, TutorError};
use crate::image::ImagePayload;
use crate::mode::Mode;
use crate::transcript::{Message, MessageId, Role};
use crate::tutor::TutorRequest;

/// Wire value of the tutor sender.
const ASSISTANT: &str = "assistant";

/// Wire value of the student sender.
const USER: &str = "user";

/// Reads an optional code field of any JSON type.
///
/// `null` is treated as absent. A non-string value becomes an empty code,
/// which no lookup recognises.
fn lenient_code<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(_) => Some(String::new()),
    })
}

/// One message as sent by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    /// `"assistant"` for the tutor; anything else is the student.
    #[serde(default, deserialize_with = "lenient_code")]
    pub sender: Option<String>,
    /// Message text.
    #[serde(default)]
    pub text: Option<String>,
}

impl WireMessage {
    fn role(&self) -> Role {
        if self.sender.as_deref() == Some(ASSISTANT) {
            Role::Tutor
        } else {
            Role::Student
        }
    }
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        let sender = match message.role {
            Role::Tutor => ASSISTANT,
            Role::Student => USER,
        };
        Self {
            sender: Some(sender.to_string()),
            text: Some(message.text.clone()),
        }
    }
}

/// Image as sent by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireImage {
    /// Base64 data, optionally with a data-URI prefix.
    #[serde(default)]
    pub base64: Option<String>,
    /// Declared MIME type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Request body of `POST /api/tamarini`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Conversation so far, oldest first.
    #[serde(default)]
    pub messages: Option<Vec<WireMessage>>,
    /// Optional exercise image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<WireImage>,
    /// `"fr"` or `"ar"`; anything else means French.
    #[serde(
        default,
        deserialize_with = "lenient_code",
        skip_serializing_if = "Option::is_none"
    )]
    pub language: Option<String>,
    /// `"normal"`, `"check-step"` or `"similar-exercise"`; anything else means normal.
    #[serde(
        default,
        deserialize_with = "lenient_code",
        skip_serializing_if = "Option::is_none"
    )]
    pub mode: Option<String>,
}

impl ChatRequest {
    /// Validates the body and converts it into a [`TutorRequest`].
    ///
    /// `default_language` applies only when the body names no language at all.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::Validation` if `messages` is missing or empty.
    pub fn into_tutor_request(self, default_language: Language) -> Result<TutorRequest> {
        let wire_messages = match self.messages {
            Some(messages) if !messages.is_empty() => messages,
            _ => return Err(TutorError::validation("Missing messages")),
        };

        let messages = (1_u64..)
            .zip(wire_messages)
            .map(|(id, m)| {
                let role = m.role();
                Message::new(MessageId(id), role, m.text.unwrap_or_default())
            })
            .collect();

        let image = self.image.and_then(|image| match image.base64 {
            Some(data) if !data.is_empty() => Some(ImagePayload::new(
                data,
                image.mime_type.unwrap_or_default(),
            )),
            _ => None,
        });

        let language = match self.language.as_deref() {
            None => default_language,
            code => Language::from_code(code),
        };

        Ok(TutorRequest {
            messages,
            image,
            language,
            mode: Mode::from_code(self.mode.as_deref()),
        })
    }
}

impl From<&TutorRequest> for ChatRequest {
    fn from(request: &TutorRequest) -> Self {
        Self {
            messages: Some(request.messages.iter().map(WireMessage::from).collect()),
            image: request.image.as_ref().map(|image| WireImage {
                base64: Some(image.encoded.clone()),
                mime_type: Some(image.effective_mime_type().to_string()),
            }),
            language: Some(request.language.code().to_string()),
            mode: Some(request.mode.code().to_string()),
        }
    }
}

/// Successful response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// The tutor's next message.
    pub reply: String,
}

/// Error response body returned on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Description of the error.
    pub error: String,
}
