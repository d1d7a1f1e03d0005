//! Fragment store on a shared directory
//!
//! ```text
//! <root>/
//! └── <instance-id>/
//!     ├── marker.json
//!     └── fragments/
//!         ├── items.0.json
//!         ├── mountedPages.json
//!         └── ...
//! ```

use crate::error::StoreError;
use crate::fragment::{FragmentStore, InstanceMarker};
use crate::fs::{read_optional, write_atomic};
use crate::identity::InstanceId;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use trellis_chunk::{Chunk, ChunkId};

const MARKER_FILE: &str = "marker.json";
const FRAGMENT_DIR: &str = "fragments";
const FRAGMENT_EXT: &str = ".json";

/// Fragment store backed by one directory per instance
///
/// Suitable for a folder mirrored between devices by a file-sync service.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Store rooted at `root`; the directory is created on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn instance_dir(&self, instance: InstanceId) -> PathBuf {
        self.root.join(instance.to_string())
    }

    fn fragment_dir(&self, instance: InstanceId) -> PathBuf {
        self.instance_dir(instance).join(FRAGMENT_DIR)
    }

    /// File holding one fragment; ids whose key is not a plain token never
    /// reach the filesystem
    fn fragment_path(&self, instance: InstanceId, id: &ChunkId) -> Result<PathBuf, StoreError> {
        id.check().map_err(|source| StoreError::InvalidFragmentId {
            id: id.to_string(),
            source,
        })?;
        Ok(self.fragment_dir(instance).join(format!("{id}{FRAGMENT_EXT}")))
    }

    async fn list_dir(path: &Path) -> Result<Vec<String>, StoreError> {
        let mut entries = match tokio::fs::read_dir(path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io_error(path, e)),
        };
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| StoreError::io_error(path, e))? {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn write_chunk(&self, instance: InstanceId, chunk: &Chunk) -> Result<(), StoreError> {
        let path = self.fragment_path(instance, &chunk.address)?;
        write_atomic(&path, &serde_json::to_vec(chunk)?).await
    }
}

#[async_trait::async_trait]
impl FragmentStore for DirectoryStore {
    async fn list_fragments(&self, instance: InstanceId) -> Result<Vec<ChunkId>, StoreError> {
        let dir = self.fragment_dir(instance);
        let mut ids = Vec::new();
        for name in Self::list_dir(&dir).await? {
            let Some(stem) = name.strip_suffix(FRAGMENT_EXT) else {
                continue;
            };
            match stem.parse::<ChunkId>() {
                Ok(id) => ids.push(id),
                Err(e) => warn!("Ignoring stray file {} in {}: {}", name, dir.display(), e),
            }
        }
        Ok(ids)
    }

    async fn read_fragment(&self, instance: InstanceId, id: &ChunkId) -> Result<Option<Chunk>, StoreError> {
        let path = self.fragment_path(instance, id)?;
        let Some(bytes) = read_optional(&path).await? else {
            return Ok(None);
        };
        let chunk: Chunk = serde_json::from_slice(&bytes).map_err(|e| StoreError::malformed(&path, e))?;
        let verified = if chunk.address == *id {
            chunk.verify()
        } else {
            Err(trellis_chunk::CodecError::checksum_mismatch(id))
        };
        if let Err(source) = verified {
            warn!("Fragment {} of instance {} is corrupt: {}", id, instance, source);
            return Err(StoreError::Corrupt {
                instance,
                id: id.to_string(),
                source,
            });
        }
        Ok(Some(chunk))
    }

    async fn write_fragments(&self, instance: InstanceId, chunks: &[Chunk]) -> Result<(), StoreError> {
        for chunk in chunks {
            self.write_chunk(instance, chunk).await?;
        }
        debug!(%instance, count = chunks.len(), "wrote fragments");
        Ok(())
    }

    async fn replace_fragments(&self, instance: InstanceId, chunks: &[Chunk]) -> Result<(), StoreError> {
        self.write_fragments(instance, chunks).await?;
        let keep: BTreeSet<&ChunkId> = chunks.iter().map(|chunk| &chunk.address).collect();
        for stale in self.list_fragments(instance).await? {
            if keep.contains(&stale) {
                continue;
            }
            let path = self.fragment_path(instance, &stale)?;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(StoreError::io_error(&path, e)),
            }
        }
        Ok(())
    }

    async fn read_instance_markers(&self) -> Result<Vec<InstanceMarker>, StoreError> {
        let mut markers = Vec::new();
        for name in Self::list_dir(&self.root).await? {
            if name.parse::<InstanceId>().is_err() {
                continue;
            }
            let path = self.root.join(&name).join(MARKER_FILE);
            let Some(bytes) = read_optional(&path).await? else {
                continue;
            };
            match serde_json::from_slice::<InstanceMarker>(&bytes) {
                Ok(marker) => markers.push(marker),
                Err(e) => warn!("Skipping malformed marker {}: {}", path.display(), e),
            }
        }
        Ok(markers)
    }

    async fn write_instance_marker(&self, marker: &InstanceMarker) -> Result<(), StoreError> {
        let path = self.instance_dir(marker.instance_id).join(MARKER_FILE);
        write_atomic(&path, &serde_json::to_vec_pretty(marker)?).await
    }
}
