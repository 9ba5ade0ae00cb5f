// src/storage/artifacts.rs
//! Request-scoped temporary files for uploaded images.
//!
//! Every [`TransientArtifact`] deletes its file exactly once: either through
//! [`TransientArtifact::release`] or, on any other exit path including
//! unwinding, when it is dropped.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::identity::types::ImageUpload;
use crate::utils::error::{IdGateError, Result};

#[derive(Clone)]
pub struct ArtifactManager {
    root: PathBuf,
    live: Arc<AtomicUsize>,
}

impl ArtifactManager {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| IdGateError::Artifact(format!("cannot create {}: {}", root.display(), e)))?;

        Ok(Self {
            root,
            live: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of artifacts acquired and not yet released.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn acquire(&self, label: &str, upload: &ImageUpload) -> Result<TransientArtifact> {
        let id = Uuid::new_v4();
        let prefix = format!("{}_{}_", label, id.simple());
        let suffix = extension_of(upload.filename.as_deref());

        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(&suffix)
            .tempfile_in(&self.root)
            .map_err(|e| IdGateError::Artifact(format!("cannot create artifact: {}", e)))?;
        let path = file.path().to_path_buf();

        // Counted before the write so the drop below balances it on failure.
        self.live.fetch_add(1, Ordering::SeqCst);
        let mut artifact = TransientArtifact {
            id,
            path,
            file: None,
            released: false,
            live: self.live.clone(),
        };

        file.write_all(&upload.bytes)
            .and_then(|_| file.flush())
            .map_err(|e| IdGateError::Artifact(format!("cannot write artifact: {}", e)))?;
        artifact.file = Some(file);

        debug!(artifact = %artifact.id, path = %artifact.path.display(), "Acquired artifact");
        Ok(artifact)
    }
}

/// Keeps only a short alphanumeric extension so the engines can sniff the
/// format; the caller's file name never reaches the filesystem.
fn extension_of(filename: Option<&str>) -> String {
    filename
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

pub struct TransientArtifact {
    id: Uuid,
    path: PathBuf,
    file: Option<NamedTempFile>,
    released: bool,
    live: Arc<AtomicUsize>,
}

impl std::fmt::Debug for TransientArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransientArtifact")
            .field("id", &self.id)
            .field("path", &self.path)
            .finish()
    }
}

impl TransientArtifact {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if let Some(file) = self.file.take() {
            match file.close() {
                Ok(()) => debug!(artifact = %self.id, "Released artifact"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(artifact = %self.id, "Artifact already gone")
                }
                Err(e) => warn!(artifact = %self.id, "Failed to remove artifact: {}", e),
            }
        }
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Drop for TransientArtifact {
    fn drop(&mut self) {
        self.release_inner();
    }
}
