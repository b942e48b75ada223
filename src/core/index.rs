//! Local index of every torrent hash ever seen per library item.
//!
//! When a whole series or movie is deleted, the library app drops its
//! history along with it, so the hashes to remove have to be known in
//! advance. Entries are small JSON documents laid out as
//! `<home>/.index/<namespace>/<key>.json`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

/// Directory under the arrcoon home that holds all namespaces
pub const INDEX_DIR: &str = ".index";

/// Independent partitions of the index, one per library app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Sonarr,
    Radarr,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sonarr => "sonarr",
            Self::Radarr => "radarr",
        }
    }

    /// Entry key for a series (Sonarr) or movie (Radarr) id
    pub fn key(&self, item_id: i64) -> String {
        match self {
            Self::Sonarr => format!("series_{}", item_id),
            Self::Radarr => format!("movie_{}", item_id),
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-disk record for one item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFile {
    #[serde(default)]
    pub hashes: Vec<String>,
}

/// Index persistence failures
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Failed to {action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize index entry {}: {source}", .path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// File-based index store
#[derive(Debug, Clone)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    /// Open the index under an arrcoon home directory
    pub fn new(home: impl AsRef<Path>) -> Self {
        Self::with_root(home.as_ref().join(INDEX_DIR))
    }

    /// Use `root` directly as the index directory
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding every entry of a namespace
    pub fn namespace_dir(&self, namespace: Namespace) -> PathBuf {
        self.root.join(namespace.as_str())
    }

    /// Path of a single entry
    pub fn entry_path(&self, namespace: Namespace, key: &str) -> PathBuf {
        self.namespace_dir(namespace).join(format!("{}.json", key))
    }

    /// Write (or overwrite) an entry, creating directories as needed
    pub async fn save(
        &self,
        namespace: Namespace,
        key: &str,
        hashes: &[String],
    ) -> Result<(), IndexError> {
        let path = self.entry_path(namespace, key);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| IndexError::Io {
                    action: "create index directory",
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let entry = IndexFile {
            hashes: hashes.to_vec(),
        };
        let json = serde_json::to_vec(&entry).map_err(|source| IndexError::Serialize {
            path: path.clone(),
            source,
        })?;

        fs::write(&path, json)
            .await
            .map_err(|source| IndexError::Io {
                action: "write index entry",
                path: path.clone(),
                source,
            })?;

        debug!(path = %path.display(), hashes = hashes.len(), "Index entry saved");
        Ok(())
    }

    /// Read an entry's hashes.
    ///
    /// A missing entry and an unreadable or corrupt one both yield an empty
    /// list; the latter is logged.
    pub async fn load(&self, namespace: Namespace, key: &str) -> Vec<String> {
        let path = self.entry_path(namespace, key);

        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No index entry");
                return Vec::new();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read index entry");
                return Vec::new();
            }
        };

        match serde_json::from_slice::<IndexFile>(&content) {
            Ok(entry) => entry.hashes,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to parse index entry");
                Vec::new()
            }
        }
    }

    /// Remove an entry; a missing entry is not an error
    pub async fn delete(&self, namespace: Namespace, key: &str) -> Result<(), IndexError> {
        let path = self.entry_path(namespace, key);

        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Index entry removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(IndexError::Io {
                action: "remove index entry",
                path,
                source,
            }),
        }
    }

    /// Remove every entry of a namespace; a missing namespace is not an error
    pub async fn drop_all(&self, namespace: Namespace) -> Result<(), IndexError> {
        let dir = self.namespace_dir(namespace);

        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                info!(path = %dir.display(), "Index dropped");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(IndexError::Io {
                action: "remove index directory",
                path: dir,
                source,
            }),
        }
    }
}
