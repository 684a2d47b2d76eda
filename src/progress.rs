//! Durable crawl checkpoint
//!
//! The progress store is the single cross-worker shared mutable resource: an
//! append-only set of canonical URLs whose artifacts have been durably
//! persisted. Every mutation is serialized behind one mutex and persisted
//! immediately with a write-then-rename, so a crash at any point leaves
//! either the old or the new checkpoint on disk, never a torn one.
//!
//! Ordering contract: a URL is marked complete only *after* its artifact has
//! been committed to the artifact store. A resumed run therefore never sees a
//! "complete" target with a missing artifact.

use crate::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// On-disk shape of the checkpoint file
#[derive(Debug, Default, Serialize, Deserialize)]
struct CheckpointFile {
    #[serde(default)]
    completed: BTreeSet<String>,
}

/// Thread-safe set of completed targets, persisted after every completion
///
/// One persist per completed target trades write amplification for minimal
/// reprocessing after a crash.
pub struct ProgressStore {
    path: PathBuf,
    inner: Mutex<BTreeSet<String>>,
}

impl ProgressStore {
    /// Opens (or initializes) the checkpoint at `path`
    ///
    /// A missing or corrupt checkpoint is treated as empty with a warning,
    /// never as a fatal error: the worst case is reprocessing work.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let completed = Self::load_from_disk(&path);
        tracing::info!(
            "Loaded checkpoint: {} completed targets ({})",
            completed.len(),
            path.display()
        );
        Self {
            path,
            inner: Mutex::new(completed),
        }
    }

    /// Opens the checkpoint in fresh-start mode, clearing any prior entries
    pub fn open_fresh(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            fs::remove_file(&path)?;
            tracing::info!("Cleared previous checkpoint at {}", path.display());
        }
        Ok(Self {
            path,
            inner: Mutex::new(BTreeSet::new()),
        })
    }

    fn load_from_disk(path: &Path) -> BTreeSet<String> {
        if !path.exists() {
            return BTreeSet::new();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<CheckpointFile>(&content) {
                Ok(file) => file.completed,
                Err(e) => {
                    tracing::warn!(
                        "Checkpoint {} is corrupt ({}), starting from an empty set",
                        path.display(),
                        e
                    );
                    BTreeSet::new()
                }
            },
            Err(e) => {
                tracing::warn!(
                    "Could not read checkpoint {} ({}), starting from an empty set",
                    path.display(),
                    e
                );
                BTreeSet::new()
            }
        }
    }

    /// Returns whether a target's canonical URL is already marked complete
    pub fn contains(&self, url: &str) -> bool {
        self.inner.lock().expect("checkpoint mutex poisoned").contains(url)
    }

    /// Number of completed targets
    pub fn len(&self) -> usize {
        self.inner.lock().expect("checkpoint mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Marks a target complete and persists the checkpoint immediately
    ///
    /// Callers must only invoke this after the target's artifact is durably
    /// on disk. The mutex is held for the whole read-modify-write-persist so
    /// concurrent completions cannot lose entries; it is never held across a
    /// network call.
    pub fn mark_complete(&self, url: &str) -> Result<()> {
        let mut completed = self.inner.lock().expect("checkpoint mutex poisoned");
        if !completed.insert(url.to_string()) {
            // Already recorded; nothing new to persist.
            return Ok(());
        }
        self.persist(&completed)
    }

    /// Snapshot of all completed URLs
    pub fn snapshot(&self) -> BTreeSet<String> {
        self.inner.lock().expect("checkpoint mutex poisoned").clone()
    }

    /// Atomic write: serialize to a temp file beside the target, then rename
    fn persist(&self, completed: &BTreeSet<String>) -> Result<()> {
        let file = CheckpointFile {
            completed: completed.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| {
            HarvestError::Checkpoint(format!("write {} failed: {}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            HarvestError::Checkpoint(format!("commit {} failed: {}", self.path.display(), e))
        })?;
        Ok(())
    }
}
