//! Configuration model loaded from `config.toml`.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root of the configuration file. Every field has a default.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct StoryloomConfig {
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub gemini: GeminiSettings,
}

impl StoryloomConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SessionSettings {
    /// Debounce window for autosave
    pub autosave_delay_ms: u64,
    /// Upper bound for a single engine request
    pub request_timeout_secs: u64,
    /// Number of player choices after which a story is concluded
    pub max_choice_points: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            autosave_delay_ms: 2000,
            request_timeout_secs: 60,
            max_choice_points: 10,
        }
    }
}

impl SessionSettings {
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct GeminiSettings {
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = StoryloomConfig::from_toml_str("").unwrap();
        assert_eq!(config, StoryloomConfig::default());
        assert_eq!(config.session.autosave_delay(), Duration::from_secs(2));
        assert_eq!(config.session.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.session.max_choice_points, 10);
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_partial_sections() {
        let config = StoryloomConfig::from_toml_str(
            "[session]\nautosave_delay_ms = 500\n\n[gemini]\nmodel = \"gemini-2.5-pro\"\n",
        )
        .unwrap();
        assert_eq!(config.session.autosave_delay_ms, 500);
        assert_eq!(config.session.request_timeout_secs, 60);
        assert_eq!(config.gemini.model, "gemini-2.5-pro");
        assert_eq!(config.gemini.api_key_env, "GEMINI_API_KEY");
    }

    #[test]
    fn test_invalid_toml_is_serialization_error() {
        let err = StoryloomConfig::from_toml_str("[session\n").unwrap_err();
        assert!(matches!(err, crate::error::StoryError::Serialization { .. }));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = StoryloomConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(StoryloomConfig::from_toml_str(&text).unwrap(), config);
    }
}
