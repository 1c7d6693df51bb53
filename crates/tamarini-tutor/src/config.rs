//! Configuration types for the TAMARINI tutor.
//!
//! Two kinds of configuration live here:
//!
//! - [`Config`]: server-side settings loaded from `tamarini.json` (model,
//!   API location, limits, endpoint path).
//! - [`Settings`]: the per-user language and theme. The client persists them
//!   and passes them explicitly into every session.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TutorError};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "tamarini.json";

/// Default model identifier.
fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

/// Default base URL of the generative language API.
fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

/// Default environment variable holding the API key.
fn default_api_key_env() -> String {
    "GOOGLE_API_KEY".to_string()
}

/// Default timeout for a single completion call, in seconds.
const fn default_request_timeout() -> u64 {
    60
}

/// Default maximum request body size (16 MiB, enough for a base64 photo).
const fn default_max_request_bytes() -> usize {
    16 * 1024 * 1024
}

/// Default path the endpoint is mounted at.
fn default_endpoint_path() -> String {
    "/api/tamarini".to_string()
}

/// Server configuration for the tutor endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Model identifier passed to the generative language API.
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the generative language API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Name of the environment variable that holds the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Timeout for a single completion call, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,

    /// Path the tutor endpoint is served at.
    #[serde(default = "default_endpoint_path")]
    pub endpoint_path: String,

    /// Language used when a request does not declare one.
    #[serde(default)]
    pub default_language: Language,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base: default_api_base(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout(),
            max_request_bytes: default_max_request_bytes(),
            endpoint_path: default_endpoint_path(),
            default_language: Language::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `tamarini.json` in the current directory. If it is missing,
    /// returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            TutorError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from `tamarini.json` in a specific directory.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::ConfigParseError` if the file exists but contains
    /// invalid JSON, and `TutorError::ConfigValidationError` if a value is
    /// out of range.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(TutorError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| TutorError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::ConfigValidationError` if any check fails.
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(TutorError::config_validation(
                "model must not be empty",
                "Set model to a generative model id such as \"gemini-2.5-flash\"",
            ));
        }

        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err(TutorError::config_validation(
                format!("apiBase must be an http(s) URL, got '{}'", self.api_base),
                "Set apiBase to e.g. \"https://generativelanguage.googleapis.com\"",
            ));
        }

        if self.api_key_env.trim().is_empty() {
            return Err(TutorError::config_validation(
                "apiKeyEnv must not be empty",
                "Set apiKeyEnv to the name of the variable holding your key (e.g. \"GOOGLE_API_KEY\")",
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(TutorError::config_validation(
                "requestTimeoutSecs must be greater than 0",
                "Set requestTimeoutSecs to at least 1 second in your tamarini.json",
            ));
        }

        if self.max_request_bytes == 0 {
            return Err(TutorError::config_validation(
                "maxRequestBytes must be greater than 0",
                "Set maxRequestBytes large enough to hold a base64-encoded photo",
            ));
        }

        if !self.endpoint_path.starts_with('/') {
            return Err(TutorError::config_validation(
                format!("endpointPath must start with '/', got '{}'", self.endpoint_path),
                "Use an absolute path such as \"/api/tamarini\"",
            ));
        }

        Ok(())
    }

    /// Reads the API key from the environment variable named by `api_key_env`.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::MissingApiKey` if the variable is unset or blank.
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(TutorError::missing_api_key(&self.api_key_env)),
        }
    }
}

// ============================================================================
// Language
// ============================================================================

/// Tutoring and interface language.
///
/// Unknown or missing values fall back to French everywhere: on the wire, in
/// config files, and in persisted settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Language {
    /// French (default).
    #[default]
    Fr,
    /// Modern Standard Arabic.
    Ar,
}

impl Language {
    /// Parses a language code, falling back to French for anything unknown.
    ///
    /// Only the exact codes `"fr"` and `"ar"` are recognised.
    #[must_use]
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("ar") => Self::Ar,
            _ => Self::Fr,
        }
    }

    /// Returns the wire code (`"fr"` or `"ar"`).
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Fr => "fr",
            Self::Ar => "ar",
        }
    }

    /// Returns `true` for languages written right to left.
    #[must_use]
    pub const fn is_rtl(self) -> bool {
        matches!(self, Self::Ar)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl<'de> Deserialize<'de> for Language {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = Option::<String>::deserialize(deserializer)?;
        Ok(Self::from_code(s.as_deref()))
    }
}

impl Serialize for Language {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.code())
    }
}

// ============================================================================
// Theme and Settings
// ============================================================================

/// Colour theme of the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light theme (default).
    #[default]
    Light,
    /// Dark theme.
    Dark,
}

impl Theme {
    /// Parses a theme name case-insensitively.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Light => write!(f, "light"),
            Self::Dark => write!(f, "dark"),
        }
    }
}

/// Unknown persisted themes fall back to light instead of failing the load.
fn deserialize_theme<'de, D>(deserializer: D) -> std::result::Result<Theme, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    Ok(s.as_deref().and_then(Theme::from_name).unwrap_or_default())
}

/// Per-user settings that survive restarts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Interface and tutoring language.
    #[serde(default)]
    pub language: Language,

    /// Colour theme.
    #[serde(default, deserialize_with = "deserialize_theme")]
    pub theme: Theme,
}

impl Settings {
    /// Loads settings from a JSON file.
    ///
    /// A missing file yields default settings.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::ConfigParseError` if the file is not valid JSON.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| TutorError::config_parse(path, e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(TutorError::config_parse(
                path,
                format!("failed to read file: {e}"),
            )),
        }
    }

    /// Saves settings to a JSON file, creating parent directories as needed.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_values() {
        let config = Config::default();

        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.api_base, "https://generativelanguage.googleapis.com");
        assert_eq!(config.api_key_env, "GOOGLE_API_KEY");
        assert_eq!(config.request_timeout_secs, 60);
        assert_eq!(config.max_request_bytes, 16 * 1024 * 1024);
        assert_eq!(config.endpoint_path, "/api/tamarini");
        assert_eq!(config.default_language, Language::Fr);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_missing_file_returns_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_config_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("tamarini.json"),
            r#"{"model": "gemini-2.0-flash", "defaultLanguage": "ar"}"#,
        )
        .unwrap();

        let config = Config::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.default_language, Language::Ar);
        assert_eq!(config.request_timeout_secs, 60);
    }

    #[test]
    fn test_config_invalid_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tamarini.json"), "{ not json").unwrap();

        let err = Config::load_from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, TutorError::ConfigParseError { .. }));
    }

    #[test]
    fn test_config_validation_rejects_zero_timeout() {
        let config = Config {
            request_timeout_secs: 0,
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("requestTimeoutSecs"));
    }

    #[test]
    fn test_config_validation_rejects_relative_endpoint() {
        let config = Config {
            endpoint_path: "api/tamarini".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(TutorError::ConfigValidationError { .. })
        ));
    }

    #[test]
    fn test_config_validation_rejects_non_http_base() {
        let config = Config {
            api_base: "ftp://example.com".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_missing() {
        let config = Config {
            api_key_env: "TAMARINI_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..Config::default()
        };
        let err = config.api_key().unwrap_err();
        assert!(matches!(err, TutorError::MissingApiKey { .. }));
    }

    #[test]
    fn test_language_from_code_falls_back_to_french() {
        assert_eq!(Language::from_code(Some("ar")), Language::Ar);
        assert_eq!(Language::from_code(Some("AR")), Language::Fr);
        assert_eq!(Language::from_code(Some(" ar ")), Language::Fr);
        assert_eq!(Language::from_code(Some("fr")), Language::Fr);
        assert_eq!(Language::from_code(Some("en")), Language::Fr);
        assert_eq!(Language::from_code(Some("")), Language::Fr);
        assert_eq!(Language::from_code(None), Language::Fr);
    }

    #[test]
    fn test_language_serialization() {
        assert_eq!(serde_json::to_string(&Language::Fr).unwrap(), "\"fr\"");
        assert_eq!(serde_json::to_string(&Language::Ar).unwrap(), "\"ar\"");

        let lang: Language = serde_json::from_str("\"de\"").unwrap();
        assert_eq!(lang, Language::Fr);
        let lang: Language = serde_json::from_str("null").unwrap();
        assert_eq!(lang, Language::Fr);
    }

    #[test]
    fn test_language_direction() {
        assert!(Language::Ar.is_rtl());
        assert!(!Language::Fr.is_rtl());
    }

    #[test]
    fn test_theme_from_name() {
        assert_eq!(Theme::from_name("dark"), Some(Theme::Dark));
        assert_eq!(Theme::from_name("LIGHT"), Some(Theme::Light));
        assert_eq!(Theme::from_name("solarized"), None);
    }

    #[test]
    fn test_settings_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/settings.json");
        let settings = Settings {
            language: Language::Ar,
            theme: Theme::Dark,
        };

        settings.save_to_file(&path).unwrap();
        let loaded = Settings::load_from_file(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_settings_unknown_values_fall_back() {
        let settings: Settings =
            serde_json::from_str(r#"{"language": "es", "theme": "neon"}"#).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_settings_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from_file(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings.language, Language::Fr);
        assert_eq!(settings.theme, Theme::Light);
    }
}
