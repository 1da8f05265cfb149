//! Bearer-token acquisition.
//!
//! The consent flow itself lives outside this crate; the engine only
//! needs a `TokenSource` that can produce a bearer token, silently for
//! autosave sweeps or interactively for user-initiated saves, and an
//! in-memory cache that can be evicted when a token goes stale.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Result, StickydocError};

const TOKEN_FILE: &str = "token.json";

#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Produce a bearer token. `interactive` is true for user-initiated
    /// saves, where a source may prompt; silent sources ignore it.
    async fn fetch(&self, interactive: bool) -> Result<String>;
}

/// In-memory token cache shared by every save attempt. The token is
/// fetched once, reused until an auth failure evicts it.
#[derive(Clone)]
pub struct CachedToken {
    source: Arc<dyn TokenSource>,
    cached: Arc<RwLock<Option<String>>>,
}

impl CachedToken {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self {
            source,
            cached: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn acquire(&self, interactive: bool) -> Result<String> {
        if let Some(token) = self.cached.read().await.clone() {
            return Ok(token);
        }
        let token = self.source.fetch(interactive).await?;
        *self.cached.write().await = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached token so the next acquisition re-fetches.
    pub async fn evict(&self) {
        debug!("evicting cached bearer token");
        *self.cached.write().await = None;
    }
}

/// On-disk token shape: either `{"access_token": "..."}` or the raw token.
#[derive(Deserialize)]
struct TokenFile {
    access_token: String,
}

/// Reads `$STICKYDOC_TOKEN`, falling back to `token.json` in the data
/// directory. External tooling (or the user) is responsible for keeping
/// that token fresh.
pub struct FileTokenSource {
    path: PathBuf,
}

impl FileTokenSource {
    pub fn new(data_dir: &std::path::Path) -> Self {
        Self {
            path: data_dir.join(TOKEN_FILE),
        }
    }
}

#[async_trait]
impl TokenSource for FileTokenSource {
    async fn fetch(&self, interactive: bool) -> Result<String> {
        if let Ok(token) = std::env::var("STICKYDOC_TOKEN") {
            if !token.is_empty() {
                return Ok(token);
            }
        }

        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|_| {
            let hint = if interactive {
                format!(
                    "no token available; set STICKYDOC_TOKEN or write {}",
                    self.path.display()
                )
            } else {
                "no token available for background save".to_string()
            };
            StickydocError::Auth(hint)
        })?;

        let trimmed = raw.trim();
        if let Ok(file) = serde_json::from_str::<TokenFile>(trimmed) {
            return Ok(file.access_token);
        }
        if trimmed.is_empty() {
            return Err(StickydocError::Auth(format!(
                "{} is empty",
                self.path.display()
            )));
        }
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn fetch(&self, _interactive: bool) -> Result<String> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("token-{}", n))
        }
    }

    #[tokio::test]
    async fn test_cache_fetches_once_until_evicted() {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let cached = CachedToken::new(source.clone());

        assert_eq!(cached.acquire(false).await.unwrap(), "token-0");
        assert_eq!(cached.acquire(true).await.unwrap(), "token-0");

        cached.evict().await;
        assert_eq!(cached.acquire(false).await.unwrap(), "token-1");
    }

    #[tokio::test]
    async fn test_file_source_parses_json_token() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(TOKEN_FILE),
            r#"{"access_token": "ya29.secret"}"#,
        )
        .unwrap();
        let source = FileTokenSource::new(tmp.path());
        assert_eq!(source.fetch(false).await.unwrap(), "ya29.secret");
    }

    #[tokio::test]
    async fn test_file_source_missing_file_is_auth_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = FileTokenSource::new(tmp.path());
        let err = source.fetch(true).await.unwrap_err();
        assert!(err.is_auth());
    }
}
