use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::{debug, instrument, warn};

use crate::storage::{Error, Result};

/// Corpus configuration, stored as JSON.
///
/// ```json
/// {
///   "version": 1,
///   "default_namespace": "local",
///   "mounts": [ { "namespace": "local", "root": "root" } ]
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CorpusConfig {
    /// Version of the configuration format, for future migrations.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Namespace used for corpus paths that do not name one.
    #[serde(default)]
    pub default_namespace: Option<String>,
    #[serde(default)]
    pub mounts: Vec<MountConfig>,
}

/// A root folder mounted under a namespace.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MountConfig {
    pub namespace: String,
    pub root: String,
}

fn default_version() -> u32 {
    1
}

impl Default for CorpusConfig {
    fn default() -> Self {
        CorpusConfig {
            version: default_version(),
            default_namespace: None,
            mounts: Vec::new(),
        }
    }
}

impl CorpusConfig {
    /// Reads and deserializes a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the file is missing, unreadable, or malformed.
    #[instrument(skip(path), fields(path = %path.display()))]
    pub async fn read(path: &Path) -> Result<CorpusConfig> {
        let content = fs::read(path).await.map_err(|e| {
            warn!("Failed to read corpus config file '{}': {}", path.display(), e);
            Error::InvalidConfig(path.to_path_buf())
        })?;

        serde_json::from_slice(&content).map_err(|e| {
            warn!("Failed to parse corpus config file '{}': {}", path.display(), e);
            Error::InvalidConfig(path.to_path_buf())
        })
    }

    /// Serializes and writes the configuration to `path`.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn write(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        debug!("Corpus config written successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        let config = CorpusConfig {
            version: 1,
            default_namespace: Some("local".to_string()),
            mounts: vec![MountConfig { namespace: "local".to_string(), root: "root".to_string() }],
        };

        config.write(&path).await.unwrap();
        let read = CorpusConfig::read(&path).await.unwrap();
        assert_eq!(read, config);
    }

    #[tokio::test]
    async fn test_missing_fields_use_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        fs::write(&path, "{}").await.unwrap();

        let read = CorpusConfig::read(&path).await.unwrap();
        assert_eq!(read, CorpusConfig::default());
    }

    #[tokio::test]
    async fn test_read_fails_if_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");

        let result = CorpusConfig::read(&path).await;
        assert!(matches!(result, Err(Error::InvalidConfig(p)) if p == path));
    }

    #[tokio::test]
    async fn test_read_fails_if_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        fs::write(&path, "{ not json }").await.unwrap();

        let result = CorpusConfig::read(&path).await;
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
