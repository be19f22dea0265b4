//! services/app/src/adapters/file_storage.rs
//!
//! Local storage backed by a single JSON object on disk.

use async_trait::async_trait;
use chrono::Utc;
use learnlingo_core::ports::{LocalStorage, PortError, PortResult};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::warn;

/// Key/value pairs persisted as `{"key": "value", ...}` in one file.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file.
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> PortResult<BTreeMap<String, String>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(PortError::Unexpected(e.to_string())),
        };
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        match serde_json::from_str(&raw) {
            Ok(items) => Ok(items),
            Err(e) => {
                let aside = self.move_aside().await?;
                warn!(
                    "Local storage file {:?} is unreadable, moved to {:?} and starting empty: {}",
                    self.path, aside, e
                );
                Ok(BTreeMap::new())
            }
        }
    }

    /// Renames an unreadable file so the next write does not destroy it.
    async fn move_aside(&self) -> PortResult<PathBuf> {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".corrupt-{}", Utc::now().format("%Y%m%dT%H%M%S%3f")));
        let aside = self.path.with_file_name(name);
        tokio::fs::rename(&self.path, &aside)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(aside)
    }

    async fn write_all(&self, items: &BTreeMap<String, String>) -> PortResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
        }
        let raw =
            serde_json::to_string_pretty(items).map_err(|e| PortError::Unexpected(e.to_string()))?;
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }
}

#[async_trait]
impl LocalStorage for FileStorage {
    async fn get_item(&self, key: &str) -> PortResult<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn set_item(&self, key: &str, value: &str) -> PortResult<()> {
        let _guard = self.lock.lock().await;
        let mut items = self.read_all().await?;
        items.insert(key.to_string(), value.to_string());
        self.write_all(&items).await
    }

    async fn remove_item(&self, key: &str) -> PortResult<()> {
        let _guard = self.lock.lock().await;
        let mut items = self.read_all().await?;
        if items.remove(key).is_some() {
            self.write_all(&items).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn values_survive_a_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let storage = FileStorage::new(&path);
        assert_eq!(storage.get_item("favorites").await.unwrap(), None);
        storage.set_item("favorites", r#"["teacher_1"]"#).await.unwrap();
        storage.set_item("other", "x").await.unwrap();

        let reopened = FileStorage::new(&path);
        assert_eq!(
            reopened.get_item("favorites").await.unwrap().as_deref(),
            Some(r#"["teacher_1"]"#)
        );
        reopened.remove_item("favorites").await.unwrap();
        assert_eq!(reopened.get_item("favorites").await.unwrap(), None);
        assert_eq!(reopened.get_item("other").await.unwrap().as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn garbage_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "not json").unwrap();
        let storage = FileStorage::new(&path);
        assert_eq!(storage.get_item("favorites").await.unwrap(), None);
    }

    #[tokio::test]
    async fn garbage_file_is_kept_aside_when_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        std::fs::write(&path, "{\"favorites\": [broken").unwrap();

        let storage = FileStorage::new(&path);
        storage.set_item("favorites", r#"["teacher_2"]"#).await.unwrap();

        let aside: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|p| p != &path)
            .collect();
        assert_eq!(aside.len(), 1);
        assert!(aside[0]
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("storage.json.corrupt-"));
        assert_eq!(
            std::fs::read_to_string(&aside[0]).unwrap(),
            "{\"favorites\": [broken"
        );
        assert_eq!(
            storage.get_item("favorites").await.unwrap().as_deref(),
            Some(r#"["teacher_2"]"#)
        );
    }
}
