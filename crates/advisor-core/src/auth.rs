//! Bearer token handling
//!
//! The backend issues JWTs out of band (login lives in the web app); this
//! client only needs to read a stored token and refuse to stream without one.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Source of the `Authorization: Bearer` value for streaming requests.
///
/// Returning `None` makes the coordinator fail the invocation immediately
/// without opening a transport connection.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self) -> Option<String>;
}

/// Token file contents
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StoredToken {
    pub access_token: String,
    /// Expiry as reported at login; `None` means never checked client-side
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredToken {
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }
}

/// Reads a JSON token file from disk, caching it in memory. An expired or
/// unreadable token counts as absent.
pub struct StoredTokenProvider {
    path: PathBuf,
    cached: Arc<RwLock<Option<StoredToken>>>,
}

impl StoredTokenProvider {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            cached: Arc::new(RwLock::new(None)),
        }
    }

    async fn load(&self) -> Option<StoredToken> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                warn!("failed to read token file {:?}: {e}", self.path);
                return None;
            }
        };
        match serde_json::from_str::<StoredToken>(&content) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!("failed to parse token file {:?}: {e}", self.path);
                None
            }
        }
    }
}

#[async_trait]
impl TokenProvider for StoredTokenProvider {
    async fn bearer_token(&self) -> Option<String> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired() {
                    return Some(token.access_token.clone());
                }
                debug!("cached token expired, re-reading {:?}", self.path);
            }
        }

        let loaded = self.load().await?;
        if loaded.is_expired() {
            warn!("stored token is expired");
            return None;
        }
        let access_token = loaded.access_token.clone();
        *self.cached.write().await = Some(loaded);
        Some(access_token)
    }
}

/// Fixed token, for tests and for `ADVISOR_TOKEN`-style env overrides
pub struct StaticTokenProvider(Option<String>);

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn empty() -> Self {
        Self(None)
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}
