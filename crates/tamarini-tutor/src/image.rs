//! Exercise images: payloads sent inline to the model, and loading from disk.

use std::path::{Path, PathBuf};

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TutorError};

/// Maximum allowed image file size in bytes (10MB).
pub const MAX_IMAGE_SIZE: u64 = 10 * 1024 * 1024;

/// MIME type assumed when none is known.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Image formats recognised by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG image format.
    Png,
    /// JPEG image format.
    Jpeg,
    /// HEIC image format (phone cameras).
    Heic,
    /// GIF image format.
    Gif,
    /// WebP image format.
    Webp,
}

impl ImageFormat {
    /// Attempts to detect image format from a file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "heic" => Some(Self::Heic),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Attempts to detect image format from a file path.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Returns the MIME type of this format.
    #[must_use]
    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Heic => "image/heic",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }
}

/// MIME type for a path, defaulting to JPEG when the extension is unknown.
#[must_use]
pub fn mime_type_for_path(path: &Path) -> &'static str {
    ImageFormat::from_path(path).map_or(DEFAULT_IMAGE_MIME, ImageFormat::mime_type)
}

/// A base64-encoded image waiting to be sent with the next request.
///
/// `encoded` may still carry a `data:image/...;base64,` prefix; it is
/// stripped when the prompt is assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    /// Base64 data, optionally with a data-URI prefix.
    #[serde(rename = "base64")]
    pub encoded: String,
    /// Declared MIME type; empty means unknown.
    #[serde(default)]
    pub mime_type: String,
    /// Where the image came from (file path, picker label). Never sent.
    #[serde(skip)]
    pub source: Option<String>,
}

impl ImagePayload {
    /// Creates a payload from already-encoded data.
    #[must_use]
    pub fn new(encoded: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            encoded: encoded.into(),
            mime_type: mime_type.into(),
            source: None,
        }
    }

    /// Loads and base64-encodes an image file.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::ImageNotFound` if the file does not exist and
    /// `TutorError::ImageTooLarge` if it exceeds [`MAX_IMAGE_SIZE`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let metadata = std::fs::metadata(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TutorError::image_not_found(path)
            } else {
                TutorError::Io(e)
            }
        })?;

        let file_size = metadata.len();
        if file_size > MAX_IMAGE_SIZE {
            return Err(TutorError::image_too_large(path, file_size / 1024));
        }

        let bytes = std::fs::read(path)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);

        Ok(Self {
            encoded,
            mime_type: mime_type_for_path(path).to_string(),
            source: Some(path.display().to_string()),
        })
    }

    /// MIME type to send, defaulting to JPEG when none was declared.
    #[must_use]
    pub fn effective_mime_type(&self) -> &str {
        if self.mime_type.trim().is_empty() {
            DEFAULT_IMAGE_MIME
        } else {
            &self.mime_type
        }
    }

    /// Lightweight reference kept on the message the image was sent with.
    #[must_use]
    pub fn reference(&self) -> ImageRef {
        ImageRef {
            mime_type: self.effective_mime_type().to_string(),
            source: self.source.clone(),
        }
    }
}

/// What a message remembers about its attached image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// MIME type of the image.
    pub mime_type: String,
    /// Where the image came from, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ImageRef {
    /// Path of the original file, when the image came from disk.
    #[must_use]
    pub fn path(&self) -> Option<PathBuf> {
        self.source.as_ref().map(PathBuf::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_image_format_from_extension() {
        assert_eq!(ImageFormat::from_extension("png"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_extension("PNG"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_extension("jpg"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("JPEG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_extension("heic"), Some(ImageFormat::Heic));
        assert_eq!(ImageFormat::from_extension("webp"), Some(ImageFormat::Webp));
        assert_eq!(ImageFormat::from_extension("bmp"), None);
    }

    #[test]
    fn test_mime_type_for_path() {
        assert_eq!(mime_type_for_path(Path::new("photo.png")), "image/png");
        assert_eq!(mime_type_for_path(Path::new("/tmp/IMG_0001.HEIC")), "image/heic");
        assert_eq!(mime_type_for_path(Path::new("scan.jpeg")), "image/jpeg");
        assert_eq!(mime_type_for_path(Path::new("scan.tiff")), "image/jpeg");
        assert_eq!(mime_type_for_path(Path::new("no_extension")), "image/jpeg");
    }

    #[test]
    fn test_effective_mime_type_defaults_to_jpeg() {
        assert_eq!(ImagePayload::new("AAAA", "").effective_mime_type(), "image/jpeg");
        assert_eq!(ImagePayload::new("AAAA", "  ").effective_mime_type(), "image/jpeg");
        assert_eq!(
            ImagePayload::new("AAAA", "image/png").effective_mime_type(),
            "image/png"
        );
    }

    #[test]
    fn test_load_encodes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exercise.png");
        std::fs::write(&path, b"hello").unwrap();

        let payload = ImagePayload::load(&path).unwrap();
        assert_eq!(payload.encoded, "aGVsbG8=");
        assert_eq!(payload.mime_type, "image/png");
        assert_eq!(payload.reference().path(), Some(path));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ImagePayload::load("/definitely/not/here.jpg").unwrap_err();
        assert!(matches!(err, TutorError::ImageNotFound { .. }));
    }

    #[test]
    fn test_payload_wire_format() {
        let payload: ImagePayload =
            serde_json::from_str(r#"{"base64": "data:image/png;base64,AAAA"}"#).unwrap();
        assert_eq!(payload.encoded, "data:image/png;base64,AAAA");
        assert!(payload.mime_type.is_empty());

        let json = serde_json::to_string(&ImagePayload::new("AAAA", "image/png")).unwrap();
        assert_eq!(json, r#"{"base64":"AAAA","mimeType":"image/png"}"#);
    }
}
