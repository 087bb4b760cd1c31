//! Persistence for index artifacts.
//!
//! Each index build writes its fitted vocabulary and its vector table as
//! two separate blobs under the manifest's artifact location. Blobs carry a
//! format version; a mismatch on load is a [`Error::Storage`] and the
//! affected query degrades instead of crashing.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{Error, Result};

/// Current on-disk artifact format version.
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// A format-versioned wrapper around a serialized payload.
#[derive(Debug, Serialize, Deserialize)]
struct ArtifactEnvelope<T> {
    format_version: u32,
    payload: T,
}

/// Serialize a payload into a format-versioned blob.
pub fn encode<T: Serialize>(location: &str, payload: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(&ArtifactEnvelope { format_version: ARTIFACT_FORMAT_VERSION, payload })
        .map_err(|e| Error::Storage { location: location.to_string(), message: e.to_string() })
}

/// Deserialize a blob written by [`encode`], rejecting other format versions.
pub fn decode<T: DeserializeOwned>(location: &str, bytes: &[u8]) -> Result<T> {
    let envelope: ArtifactEnvelope<T> = serde_json::from_slice(bytes)
        .map_err(|e| Error::Storage { location: location.to_string(), message: e.to_string() })?;
    if envelope.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(Error::Storage {
            location: location.to_string(),
            message: format!(
                "unsupported artifact format version {} (expected {ARTIFACT_FORMAT_VERSION})",
                envelope.format_version
            ),
        });
    }
    Ok(envelope.payload)
}

/// Blob storage addressed by manifest artifact locations.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Write a blob, replacing any previous blob at the location.
    async fn write(&self, location: &str, blob: &[u8]) -> Result<()>;

    /// Read a blob. Missing or unreadable blobs are [`Error::Storage`].
    async fn read(&self, location: &str) -> Result<Vec<u8>>;
}

/// Filesystem-backed artifact store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, location: &str) -> PathBuf {
        self.root.join(location)
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn write(&self, location: &str, blob: &[u8]) -> Result<()> {
        let path = self.path_for(location);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::Storage {
                location: location.to_string(),
                message: e.to_string(),
            })?;
        }
        std::fs::write(&path, blob).map_err(|e| Error::Storage {
            location: location.to_string(),
            message: e.to_string(),
        })
    }

    async fn read(&self, location: &str) -> Result<Vec<u8>> {
        std::fs::read(self.path_for(location)).map_err(|e| Error::Storage {
            location: location.to_string(),
            message: e.to_string(),
        })
    }
}

/// In-memory artifact store for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryArtifactStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn write(&self, location: &str, blob: &[u8]) -> Result<()> {
        self.blobs.write().await.insert(location.to_string(), blob.to_vec());
        Ok(())
    }

    async fn read(&self, location: &str) -> Result<Vec<u8>> {
        self.blobs.read().await.get(location).cloned().ok_or_else(|| Error::Storage {
            location: location.to_string(),
            message: "artifact not found".to_string(),
        })
    }
}
