//! Error types for the TAMARINI tutor.
//!
//! This module defines the error hierarchy for every tutoring operation:
//! request validation, completion failures, configuration loading, image
//! loading, and session state transitions.

use std::path::PathBuf;

/// A specialized `Result` type for tutor operations.
pub type Result<T> = std::result::Result<T, TutorError>;

/// Errors that can occur while turning a conversation into a tutor reply.
///
/// Variants are grouped by subsystem. Configuration and image variants carry
/// actionable suggestions because they are shown to the operator; completion
/// variants are only ever logged and never reach the student verbatim.
#[derive(Debug, thiserror::Error)]
pub enum TutorError {
    // ========================================================================
    // Request Errors
    // ========================================================================
    /// The request body was malformed or carried no messages.
    #[error("Invalid request: {message}")]
    Validation {
        /// Description of what was wrong with the request.
        message: String,
    },

    /// The request body exceeded the configured size limit.
    #[error("Request body exceeds the {limit} byte limit")]
    RequestTooLarge {
        /// Configured limit in bytes.
        limit: usize,
    },

    /// The endpoint was called with a method other than `POST`.
    #[error("Method {method} not allowed")]
    UnsupportedMethod {
        /// The rejected HTTP method.
        method: String,
    },

    // ========================================================================
    // Completion Errors
    // ========================================================================
    /// The model answered, but with no text.
    #[error("The model returned an empty reply")]
    EmptyReply,

    /// The model call failed (transport, authentication, quota, server).
    #[error("Generation failed ({kind}): {message}")]
    GenerationFailed {
        /// Classification of the failure.
        kind: ModelErrorKind,
        /// Underlying message, for diagnostics only.
        message: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in a configuration or settings file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your tamarini.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    /// The model API key is not present in the environment.
    #[error("API key not set: environment variable '{env_var}' is empty or missing\n\nSuggestion: Export {env_var} before starting the server")]
    MissingApiKey {
        /// Name of the environment variable that was checked.
        env_var: String,
    },

    // ========================================================================
    // Image Errors
    // ========================================================================
    /// Image file was not found at the specified path.
    #[error("Image not found: '{path}'\n\nSuggestion: Check the path passed to /image")]
    ImageNotFound {
        /// Path where the image was expected.
        path: PathBuf,
    },

    /// Image file exceeds the size limit.
    #[error("Image exceeds size limit (10MB): '{path}' is {size_kb}KB\n\nSuggestion: Take a smaller photo or crop the exercise")]
    ImageTooLarge {
        /// Path to the oversized image.
        path: PathBuf,
        /// Actual size in kilobytes.
        size_kb: u64,
    },

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// A submit arrived while another request is still in flight.
    #[error("A reply is already being generated for this session")]
    SessionBusy,

    /// The caller stopped waiting for a reply before it arrived.
    #[error("The turn was abandoned before a reply arrived")]
    TurnAbandoned,

    /// Invalid state transition attempted.
    #[error("Invalid state transition: cannot go from {from} to {to}")]
    InvalidStateTransition {
        /// The current state.
        from: String,
        /// The attempted target state.
        to: String,
    },

    // ========================================================================
    // General I/O Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Categories of model failures for structured diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelErrorKind {
    /// Authentication failure (invalid API key, expired credentials).
    Authentication,
    /// Rate limit or quota exceeded.
    RateLimit,
    /// Server error (5xx responses).
    Server,
    /// Network connectivity issues.
    Network,
    /// Other unclassified errors, including malformed responses.
    Other,
}

impl std::fmt::Display for ModelErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::RateLimit => write!(f, "rate_limit"),
            Self::Server => write!(f, "server"),
            Self::Network => write!(f, "network"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl ModelErrorKind {
    /// Classifies an HTTP status code returned by the model API.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Authentication,
            429 => Self::RateLimit,
            500..=599 => Self::Server,
            _ => Self::Other,
        }
    }
}

impl TutorError {
    /// Creates a new `Validation` error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a new `RequestTooLarge` error.
    #[must_use]
    pub const fn request_too_large(limit: usize) -> Self {
        Self::RequestTooLarge { limit }
    }

    /// Creates a new `UnsupportedMethod` error.
    #[must_use]
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedMethod {
            method: method.into(),
        }
    }

    /// Creates a new `GenerationFailed` error.
    #[must_use]
    pub fn generation_failed(kind: ModelErrorKind, message: impl Into<String>) -> Self {
        Self::GenerationFailed {
            kind,
            message: message.into(),
        }
    }

    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `MissingApiKey` error.
    #[must_use]
    pub fn missing_api_key(env_var: impl Into<String>) -> Self {
        Self::MissingApiKey {
            env_var: env_var.into(),
        }
    }

    /// Creates a new `ImageNotFound` error.
    #[must_use]
    pub fn image_not_found(path: impl Into<PathBuf>) -> Self {
        Self::ImageNotFound { path: path.into() }
    }

    /// Creates a new `ImageTooLarge` error.
    #[must_use]
    pub fn image_too_large(path: impl Into<PathBuf>, size_kb: u64) -> Self {
        Self::ImageTooLarge {
            path: path.into(),
            size_kb,
        }
    }

    /// Creates a new `InvalidStateTransition` error.
    #[must_use]
    pub fn invalid_transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Returns `true` if this error came from the completion step.
    ///
    /// Completion failures are collapsed into a generic message for the
    /// caller and a localized apology for the student.
    #[must_use]
    pub const fn is_completion_failure(&self) -> bool {
        matches!(self, Self::EmptyReply | Self::GenerationFailed { .. })
    }

    /// Returns `true` if the request itself was at fault.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::RequestTooLarge { .. } | Self::UnsupportedMethod { .. }
        )
    }
}
