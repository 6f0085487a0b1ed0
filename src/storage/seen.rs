use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

/// Persistent set of listing ids already dispatched, snapshotted to disk
/// as a JSON array of strings. Append-only for the process lifetime.
pub struct SeenStore {
    path: PathBuf,
    ids: HashSet<String>,
}

impl SeenStore {
    /// Loads the snapshot. A missing or corrupt file yields an empty set
    /// with a warning; startup never fails on it.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let ids = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Vec<String>>(&bytes) {
                Ok(list) => {
                    let ids: HashSet<String> = list.into_iter().collect();
                    info!(count = ids.len(), path = %path.display(), "Loaded seen ids");
                    ids
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Corrupt seen file, starting empty");
                    HashSet::new()
                }
            },
            Err(_) => HashSet::new(),
        };
        Self { path, ids }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Returns true when the id was not present before.
    pub fn insert(&mut self, id: &str) -> bool {
        self.ids.insert(id.to_string())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the full set atomically: serialize to a sibling temp file,
    /// then rename over the snapshot so a crash cannot truncate it.
    pub async fn flush(&self) -> anyhow::Result<()> {
        let mut sorted: Vec<&String> = self.ids.iter().collect();
        sorted.sort();
        let bytes = serde_json::to_vec(&sorted)?;

        let tmp = PathBuf::from(format!("{}.tmp", self.path.display()));
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trip_reproduces_the_id_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");

        let mut store = SeenStore::load(&path);
        store.insert("bhphed");
        store.insert("elmcp");
        store.insert("abc");
        store.flush().await.unwrap();

        let reloaded = SeenStore::load(&path);
        assert_eq!(reloaded.len(), 3);
        assert!(reloaded.contains("bhphed"));
        assert!(reloaded.contains("elmcp"));
        assert!(reloaded.contains("abc"));
    }

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SeenStore::load(dir.path().join("nope.json"));
        assert!(store.is_empty());
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");
        std::fs::write(&path, b"{not json").unwrap();
        let store = SeenStore::load(&path);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn flush_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen.json");

        let mut store = SeenStore::load(&path);
        store.insert("x");
        store.flush().await.unwrap();

        assert!(path.exists());
        assert!(!PathBuf::from(format!("{}.tmp", path.display())).exists());
    }

    #[test]
    fn insert_reports_novelty() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = SeenStore::load(dir.path().join("seen.json"));
        assert!(store.insert("a"));
        assert!(!store.insert("a"));
    }
}
