//! Prompt assembly: instruction text, transcript, and optional inline image.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::image::ImagePayload;

/// Heading placed before the transcript.
pub const TRANSCRIPT_HEADING: &str = "Conversation so far:";

/// Trailing cue telling the model to write the next tutor turn only.
pub const TUTOR_CUE: &str = "Tutor:";

/// `data:image/<subtype>;base64,` at the start of a string.
static DATA_URI_PREFIX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^data:image/[A-Za-z0-9.+-]+;base64,").ok());

/// One part of the request sent to the model.
///
/// Serialises in the generative language API shape: `{"text": ...}` or
/// `{"inlineData": {"mimeType": ..., "data": ...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PromptPart {
    /// Plain text.
    Text {
        /// The text content.
        text: String,
    },
    /// Image bytes embedded in the request.
    InlineImage {
        /// The image payload.
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

/// Base64 image embedded in a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    /// MIME type of the image.
    pub mime_type: String,
    /// Base64 data without any data-URI prefix.
    pub data: String,
}

impl PromptPart {
    /// Returns the text of a text part.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            Self::InlineImage { .. } => None,
        }
    }

    /// Returns the inline data of an image part.
    #[must_use]
    pub const fn as_inline_image(&self) -> Option<&InlineData> {
        match self {
            Self::Text { .. } => None,
            Self::InlineImage { inline_data } => Some(inline_data),
        }
    }
}

/// Removes a leading `data:image/<subtype>;base64,` prefix, if present.
///
/// Anything without that exact prefix is returned unchanged.
#[must_use]
pub fn strip_data_uri_prefix(encoded: &str) -> &str {
    DATA_URI_PREFIX
        .as_ref()
        .and_then(|re| re.find(encoded))
        .map_or(encoded, |m| &encoded[m.end()..])
}

/// Builds the ordered prompt: one text part, then the image part if any.
///
/// The text part is the instructions, a blank line, the transcript under
/// [`TRANSCRIPT_HEADING`], and [`TUTOR_CUE`] on the last line.
#[must_use]
pub fn assemble(
    instructions: &str,
    transcript: &str,
    image: Option<&ImagePayload>,
) -> Vec<PromptPart> {
    let text = format!(
        "{instructions}\n\n{TRANSCRIPT_HEADING}\n{transcript}\n{TUTOR_CUE}",
        instructions = instructions.trim_end(),
    );

    let mut parts = vec![PromptPart::Text { text }];

    if let Some(image) = image {
        parts.push(PromptPart::InlineImage {
            inline_data: InlineData {
                mime_type: image.effective_mime_type().to_string(),
                data: strip_data_uri_prefix(&image.encoded).to_string(),
            },
        });
    }

    parts
}
