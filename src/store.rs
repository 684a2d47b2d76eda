//! Content-addressed artifact store
//!
//! One JSON document per anime, at `<root>/<address>.json`. The address is
//! derived purely from (title, canonical URL), so locating an artifact needs
//! no index. Writes go through a temp-file-then-rename commit: a concurrent
//! reader sees either the previous document or the new one, never a partial
//! write. Each address is owned by exactly one worker at a time, so the
//! store itself needs no locking.

use crate::model::Artifact;
use crate::{HarvestError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Filesystem-backed store of per-anime artifacts
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Opens the store rooted at `root`, creating the directory if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| HarvestError::Store(format!("create {} failed: {}", root.display(), e)))?;
        Ok(Self { root })
    }

    /// Path an artifact with the given content address lives at
    pub fn path_for(&self, address: &str) -> PathBuf {
        self.root.join(format!("{}.json", address))
    }

    /// Writes an artifact, atomically replacing any previous version
    ///
    /// Reprocessing a target overwrites its document wholesale; derived
    /// fields were already recomputed during assembly.
    pub fn write(&self, artifact: &Artifact) -> Result<()> {
        let path = self.path_for(&artifact.content_address);
        let json = serde_json::to_string_pretty(artifact)?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .map_err(|e| HarvestError::Store(format!("write {} failed: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &path)
            .map_err(|e| HarvestError::Store(format!("commit {} failed: {}", path.display(), e)))?;

        tracing::debug!("Wrote artifact {}", path.display());
        Ok(())
    }

    /// Loads the artifact stored under `address`
    pub fn load(&self, address: &str) -> Result<Artifact> {
        let path = self.path_for(address);
        let content = fs::read_to_string(&path)
            .map_err(|e| HarvestError::Store(format!("read {} failed: {}", path.display(), e)))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Returns whether an artifact exists for `address`
    pub fn exists(&self, address: &str) -> bool {
        self.path_for(address).is_file()
    }

    /// Enumerates every artifact currently in the store
    ///
    /// Unreadable or unparsable documents are skipped with a warning so a
    /// partially-complete store (interrupted crawl) still yields a
    /// consistent snapshot of whatever exists.
    pub fn scan(&self) -> Result<Vec<Artifact>> {
        let mut artifacts = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match Self::load_file(&path) {
                Ok(artifact) => artifacts.push(artifact),
                Err(e) => {
                    tracing::warn!("Skipping unreadable artifact {}: {}", path.display(), e);
                }
            }
        }

        Ok(artifacts)
    }

    fn load_file(path: &Path) -> Result<Artifact> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Artifact, Episode, ExtractedDetails, Target};
    use tempfile::TempDir;

    fn sample_artifact(title: &str, url: &str) -> Artifact {
        let target = Target::new(title, url);
        let episodes = vec![Episode {
            episode_number: "1".to_string(),
            episode_url: format!("{}episode-1/", url),
            episode_title: None,
            video_sources: vec!["https://cdn.example.test/embed/1".to_string()],
            has_videos: true,
        }];
        Artifact::assemble(&target, ExtractedDetails::default(), episodes)
    }

    #[test]
    fn test_write_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(dir.path().join("anime")).unwrap();

        let artifact = sample_artifact("One Piece", "https://example.test/anime/one-piece/");
        store.write(&artifact).unwrap();

        let loaded = store.load(&artifact.content_address).unwrap();
        assert_eq!(loaded.title, "One Piece");
        assert_eq!(loaded.total_episodes, 1);
        assert_eq!(loaded.available_episodes, 1);
    }

    #[test]
    fn test_write_is_idempotent_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(dir.path().join("anime")).unwrap();

        let mut artifact = sample_artifact("Naruto", "https://example.test/anime/naruto/");
        store.write(&artifact).unwrap();

        // Reprocessing replaces the document wholesale.
        artifact.episodes.clear();
        artifact.total_episodes = 0;
        artifact.available_episodes = 0;
        store.write(&artifact).unwrap();

        let loaded = store.load(&artifact.content_address).unwrap();
        assert_eq!(loaded.total_episodes, 0);
        assert!(loaded.episodes.is_empty());
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(dir.path().join("anime")).unwrap();
        store
            .write(&sample_artifact("Bleach", "https://example.test/anime/bleach/"))
            .unwrap();

        let leftovers: Vec<_> = fs::read_dir(store.root())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_scan_skips_corrupt_documents() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(dir.path().join("anime")).unwrap();

        store
            .write(&sample_artifact("Good", "https://example.test/anime/good/"))
            .unwrap();
        fs::write(store.root().join("broken.json"), "not json").unwrap();

        let artifacts = store.scan().unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].title, "Good");
    }

    #[test]
    fn test_distinct_addresses_for_hash_prefix_collisions() {
        // Different titles disambiguate even if the URL halves collide.
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(dir.path().join("anime")).unwrap();

        let url = "https://example.test/anime/shared/";
        let a = sample_artifact("Series A", url);
        let b = sample_artifact("Series B", url);
        store.write(&a).unwrap();
        store.write(&b).unwrap();

        assert_ne!(a.content_address, b.content_address);
        assert!(store.exists(&a.content_address));
        assert!(store.exists(&b.content_address));
    }

    #[test]
    fn test_full_key_collision_is_last_writer_wins() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::open(dir.path().join("anime")).unwrap();

        let url = "https://example.test/anime/shared/";
        let first = sample_artifact("Same Title", url);
        let mut second = sample_artifact("Same Title", url);
        second.description = Some("second writer".to_string());

        store.write(&first).unwrap();
        store.write(&second).unwrap();

        let loaded = store.load(&first.content_address).unwrap();
        assert_eq!(loaded.description.as_deref(), Some("second writer"));
    }
}
