//! Engine configuration.
//!
//! Settings live in `config.json` inside the data directory and can be
//! overridden per-process through `STICKYDOC_*` environment variables. The
//! only setting the engine cannot run without is the target document id.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StickydocError};

pub const CONFIG_FILE: &str = "config.json";

/// Default autosave sweep period, in seconds.
pub const DEFAULT_AUTOSAVE_SECS: u64 = 60;

/// Default Docs API endpoint.
pub const DEFAULT_API_BASE: &str = "https://docs.googleapis.com/v1";

/// Default listen address for the WebSocket/HTTP surface.
pub const DEFAULT_LISTEN: &str = "127.0.0.1:7475";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding `notes.db`, `config.json` and `token.json`.
    #[serde(skip)]
    pub data_dir: PathBuf,

    /// Target Google Doc id. All notes sync into this one document.
    pub doc_id: Option<String>,

    /// Autosave sweep period in seconds.
    pub autosave_secs: u64,

    /// Base URL of the Docs REST API.
    pub api_base: String,

    /// Listen address for `stickydoc serve`.
    pub listen: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            doc_id: None,
            autosave_secs: DEFAULT_AUTOSAVE_SECS,
            api_base: DEFAULT_API_BASE.to_string(),
            listen: DEFAULT_LISTEN.to_string(),
        }
    }
}

/// Resolve the data directory: `$STICKYDOC_HOME`, else `~/.stickydoc`.
pub fn default_data_dir() -> PathBuf {
    if let Ok(dir) = env::var("STICKYDOC_HOME") {
        return PathBuf::from(dir);
    }
    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".stickydoc")
}

impl Config {
    /// Load configuration from `config.json` in the data directory, then
    /// apply environment overrides.
    pub fn load(data_dir: PathBuf) -> Result<Self> {
        let mut config = Self {
            data_dir: data_dir.clone(),
            ..Self::default()
        };

        let path = data_dir.join(CONFIG_FILE);
        if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let file: ConfigFile = serde_json::from_str(&raw)?;
            if file.doc_id.is_some() {
                config.doc_id = file.doc_id;
            }
            if let Some(secs) = file.autosave_secs {
                config.autosave_secs = secs;
            }
            if let Some(base) = file.api_base {
                config.api_base = base;
            }
            if let Some(listen) = file.listen {
                config.listen = listen;
            }
        }

        if let Ok(doc_id) = env::var("STICKYDOC_DOC_ID") {
            if !doc_id.is_empty() {
                config.doc_id = Some(doc_id);
            }
        }
        if let Some(secs) = env::var("STICKYDOC_AUTOSAVE_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.autosave_secs = secs.max(1);
        }
        if let Ok(base) = env::var("STICKYDOC_API_BASE") {
            config.api_base = base;
        }
        if let Ok(listen) = env::var("STICKYDOC_LISTEN") {
            config.listen = listen;
        }

        Ok(config)
    }

    /// Write the current settings back to `config.json`.
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        let file = ConfigFile {
            doc_id: self.doc_id.clone(),
            autosave_secs: Some(self.autosave_secs),
            api_base: Some(self.api_base.clone()),
            listen: Some(self.listen.clone()),
        };
        let json = serde_json::to_string_pretty(&file)?;
        fs::write(self.data_dir.join(CONFIG_FILE), json)?;
        Ok(())
    }

    /// The configured document id, or the configuration error.
    pub fn doc_id(&self) -> Result<&str> {
        self.doc_id.as_deref().ok_or(StickydocError::NotConfigured)
    }

    pub fn is_configured(&self) -> bool {
        self.doc_id.is_some()
    }
}

/// On-disk shape of `config.json`. All fields optional so partial files
/// written by hand keep working.
#[derive(Debug, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    doc_id: Option<String>,
    #[serde(default)]
    autosave_secs: Option<u64>,
    #[serde(default)]
    api_base: Option<String>,
    #[serde(default)]
    listen: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load(tmp.path().to_path_buf()).unwrap();
        assert!(config.doc_id.is_none());
        assert!(!config.is_configured());
        assert_eq!(config.autosave_secs, DEFAULT_AUTOSAVE_SECS);
        assert!(matches!(
            config.doc_id(),
            Err(StickydocError::NotConfigured)
        ));
    }

    #[test]
    fn test_round_trip() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::load(tmp.path().to_path_buf()).unwrap();
        config.doc_id = Some("doc-123".to_string());
        config.autosave_secs = 5;
        config.save().unwrap();

        let reloaded = Config::load(tmp.path().to_path_buf()).unwrap();
        assert_eq!(reloaded.doc_id().unwrap(), "doc-123");
        assert_eq!(reloaded.autosave_secs, 5);
    }

    #[test]
    fn test_partial_file() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"{"doc_id": "only-doc"}"#,
        )
        .unwrap();
        let config = Config::load(tmp.path().to_path_buf()).unwrap();
        assert_eq!(config.doc_id().unwrap(), "only-doc");
        assert_eq!(config.api_base, DEFAULT_API_BASE);
    }
}
