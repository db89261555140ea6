//! Configuration types for the session client.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the SAMi session client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend endpoints.
    pub server: ServerConfig,
    /// Speech capture settings.
    pub speech: SpeechConfig,
    /// Command history settings.
    pub history: HistoryConfig,
    /// Remote media resolution settings.
    pub media: MediaConfig,
    /// Image analysis settings.
    pub analysis: AnalysisConfig,
}

/// Backend endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP base URL of the backend (no trailing slash).
    pub base_url: String,
    /// WebSocket path for the event channel.
    pub ws_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_owned(),
            ws_path: "/ws".to_owned(),
        }
    }
}

impl ServerConfig {
    /// The WebSocket URL for the event channel (http → ws scheme swap).
    #[must_use]
    pub fn ws_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_owned()
        };
        format!("{ws_base}{}", self.ws_path)
    }

    /// Join a path onto the HTTP base URL.
    #[must_use]
    pub fn http_url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

/// Speech capture configuration.
///
/// The capability session is always continuous and non-interim; these are
/// exposed so a platform backend can honor them explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Recognition locale (BCP 47 tag).
    pub locale: String,
    /// Keep the capability session open across utterances.
    pub continuous: bool,
    /// Deliver partial (interim) transcripts.
    pub interim_results: bool,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            locale: "en-US".to_owned(),
            continuous: true,
            interim_results: false,
        }
    }
}

/// Command history configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum retained commands; oldest are evicted beyond this.
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_entries: 500 }
    }
}

/// Remote media resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Same-origin proxy path used for the one-shot retry.
    pub proxy_path: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            proxy_path: "/proxy_image".to_owned(),
        }
    }
}

/// Image analysis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Analysis endpoint path on the backend.
    pub path: String,
    /// Camera settle delay before grabbing a frame, in milliseconds.
    ///
    /// Gives auto-exposure and focus time to stabilize.
    pub settle_delay_ms: u64,
    /// Prompt sent with camera captures.
    pub camera_prompt: String,
    /// Prompt sent with file uploads.
    pub upload_prompt: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            path: "/analyze_image".to_owned(),
            settle_delay_ms: 500,
            camera_prompt: "What do you see in this camera view?".to_owned(),
            upload_prompt: "Analyze this uploaded image.".to_owned(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::ClientError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ClientError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = ClientConfig::default();
        assert_eq!(config.server.base_url, "http://localhost:5000");
        assert!(config.speech.continuous);
        assert!(!config.speech.interim_results);
        assert_eq!(config.analysis.settle_delay_ms, 500);
        assert_eq!(config.media.proxy_path, "/proxy_image");
    }

    #[test]
    fn ws_url_swaps_scheme() {
        let server = ServerConfig {
            base_url: "http://sami.local:5000/".to_owned(),
            ws_path: "/ws".to_owned(),
        };
        assert_eq!(server.ws_url(), "ws://sami.local:5000/ws");

        let secure = ServerConfig {
            base_url: "https://sami.local".to_owned(),
            ws_path: "/ws".to_owned(),
        };
        assert_eq!(secure.ws_url(), "wss://sami.local/ws");
    }

    #[test]
    fn http_url_joins_path() {
        let server = ServerConfig::default();
        assert_eq!(
            server.http_url("/analyze_image"),
            "http://localhost:5000/analyze_image"
        );
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = ClientConfig::default();
        config.speech.locale = "en-GB".to_owned();
        config.history.max_entries = 42;

        assert!(config.save_to_file(&path).is_ok());
        let loaded = ClientConfig::from_file(&path).unwrap();
        assert_eq!(loaded.speech.locale, "en-GB");
        assert_eq!(loaded.history.max_entries, 42);
    }

    #[test]
    fn from_file_nonexistent_returns_error() {
        let result = ClientConfig::from_file(std::path::Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn from_file_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "not [valid toml").unwrap();
        assert!(ClientConfig::from_file(&path).is_err());
    }
}
