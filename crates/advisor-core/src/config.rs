//! Client configuration
//!
//! Loaded from `advisor/config.toml` under the platform config directory,
//! with env overrides for the backend URL and token path.

use serde::Deserialize;
use std::path::PathBuf;
use tracing::debug;

use crate::error::StreamError;

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_token_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("advisor")
        .join("token.json")
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL, e.g. `https://api.example.edu`
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path to the stored bearer token file
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token_path: default_token_path(),
        }
    }
}

impl ClientConfig {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("advisor").join("config.toml"))
    }

    /// Load from the default location, falling back to defaults when the
    /// file does not exist. Env vars `ADVISOR_BASE_URL` and
    /// `ADVISOR_TOKEN_PATH` override the file.
    pub fn load() -> Result<Self, StreamError> {
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => {
                debug!("loading config from {:?}", path);
                let content = std::fs::read_to_string(&path)
                    .map_err(|e| StreamError::InvalidConfig(format!("{path:?}: {e}")))?;
                toml::from_str(&content)
                    .map_err(|e| StreamError::InvalidConfig(format!("{path:?}: {e}")))?
            }
            _ => Self::default(),
        };

        if let Ok(url) = std::env::var("ADVISOR_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(path) = std::env::var("ADVISOR_TOKEN_PATH") {
            config.token_path = PathBuf::from(path);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert!(config.token_path.ends_with("advisor/token.json"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ClientConfig =
            toml::from_str("base_url = \"https://api.example.edu\"").expect("parse");
        assert_eq!(config.base_url, "https://api.example.edu");
        assert!(config.token_path.ends_with("token.json"));
    }

    #[test]
    fn test_full_toml() {
        let config: ClientConfig = toml::from_str(
            "base_url = \"https://api.example.edu\"\ntoken_path = \"/tmp/tok.json\"",
        )
        .expect("parse");
        assert_eq!(config.token_path, PathBuf::from("/tmp/tok.json"));
    }
}
