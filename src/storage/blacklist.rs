// src/storage/blacklist.rs
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::core::identity::types::BlacklistEntry;
use crate::utils::error::Result;

/// Copy-on-write list of disallowed reference faces. Readers take a cheap
/// snapshot; administrative updates build a new list and swap it in, so the
/// lock is only ever held for an `Arc` clone or swap.
#[derive(Default)]
pub struct BlacklistStore {
    entries: RwLock<Arc<Vec<BlacklistEntry>>>,
}

impl BlacklistStore {
    pub fn new(entries: Vec<BlacklistEntry>) -> Self {
        Self {
            entries: RwLock::new(Arc::new(entries)),
        }
    }

    /// Every regular file in `dir` becomes an entry labelled by its file name.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            warn!("Blacklist directory {} not found, starting empty", dir.display());
            return Ok(Self::default());
        }

        let mut entries = Vec::new();
        for item in std::fs::read_dir(dir)? {
            let item = item?;
            if !item.file_type()?.is_file() {
                continue;
            }
            let label = item.file_name().to_string_lossy().into_owned();
            entries.push(BlacklistEntry::new(label, item.path()));
        }
        entries.sort_by(|a, b| a.label.cmp(&b.label));

        info!("Loaded {} blacklist entries from {}", entries.len(), dir.display());
        Ok(Self::new(entries))
    }

    pub fn snapshot(&self) -> Arc<Vec<BlacklistEntry>> {
        self.entries.read().clone()
    }

    pub fn replace(&self, entries: Vec<BlacklistEntry>) {
        let next = Arc::new(entries);
        *self.entries.write() = next;
    }

    /// Appends under a single write guard so concurrent adds never drop
    /// each other's entries. Outstanding snapshots keep the old list.
    pub fn add(&self, entry: BlacklistEntry) {
        let mut guard = self.entries.write();
        Arc::make_mut(&mut *guard).push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
