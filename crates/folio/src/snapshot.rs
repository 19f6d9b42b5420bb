//! Named document snapshots stored as JSON files under the data directory.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::fs::try_exists;

use crate::config::is_valid_name;
use crate::document::DocumentState;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(flatten)]
    pub state: DocumentState,
}

#[derive(Debug, Clone)]
pub struct SnapshotManager {
    dir: PathBuf,
}

impl SnapshotManager {
    pub fn new() -> Result<Self> {
        Ok(Self::with_dir(Self::default_dir()?))
    }

    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn default_dir() -> Result<PathBuf> {
        if let Ok(dir) = std::env::var("FOLIO_DATA_DIR") {
            return Ok(PathBuf::from(dir).join("documents"));
        }
        let dirs = directories::ProjectDirs::from("com", "folio", "folio")
            .ok_or_else(|| anyhow::anyhow!("Could not determine the project data directory"))?;
        Ok(dirs.data_dir().join("documents"))
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        if !is_valid_name(name) {
            anyhow::bail!("Invalid document name '{}'", name);
        }
        Ok(self.dir.join(format!("{}.json", name)))
    }

    /// Write `state` under `name`, keeping the original creation time when
    /// the snapshot already exists.
    pub async fn save(&self, name: &str, state: &DocumentState) -> Result<String> {
        let filepath = self.path_for(name)?;
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let existing_created_at = if try_exists(&filepath).await? {
            match fs::read_to_string(&filepath).await {
                Ok(json) => match serde_json::from_str::<DocumentSnapshot>(&json) {
                    Ok(snapshot) => Some(snapshot.created_at),
                    Err(e) => {
                        log::warn!("Failed to parse existing snapshot '{}': {}", name, e);
                        None
                    }
                },
                Err(e) => {
                    log::warn!(
                        "Failed to read existing snapshot file '{}': {}",
                        filepath.display(),
                        e
                    );
                    None
                }
            }
        } else {
            None
        };

        let now = Utc::now();
        let snapshot = DocumentSnapshot {
            name: name.to_string(),
            created_at: existing_created_at.unwrap_or(now),
            modified_at: now,
            state: state.clone(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;

        // a reader never sees a half-written file
        let partial = filepath.with_extension("json.tmp");
        fs::write(&partial, json)
            .await
            .with_context(|| format!("Failed to write {}", partial.display()))?;
        fs::rename(&partial, &filepath).await?;

        log::debug!(
            "Saved snapshot '{}' ({} pages)",
            name,
            snapshot.state.pages.len()
        );
        Ok(format!("Saved '{}'", name))
    }

    pub async fn load(&self, name: &str) -> Result<DocumentSnapshot> {
        let filepath = self.path_for(name)?;
        if !try_exists(&filepath).await? {
            anyhow::bail!("Document '{}' not found", name);
        }

        let json = fs::read_to_string(&filepath).await?;
        let snapshot: DocumentSnapshot = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse {}", filepath.display()))?;
        Ok(snapshot)
    }

    /// All readable snapshots, most recently modified first.
    pub async fn list(&self) -> Result<Vec<DocumentSnapshot>> {
        if !try_exists(&self.dir).await? {
            return Ok(Vec::new());
        }

        let mut snapshots = Vec::new();
        let mut dir_entries = fs::read_dir(&self.dir).await?;

        while let Some(entry) = dir_entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match fs::read_to_string(&path).await {
                Ok(json) => match serde_json::from_str::<DocumentSnapshot>(&json) {
                    Ok(snapshot) => snapshots.push(snapshot),
                    Err(e) => log::warn!("Skipping unreadable snapshot {}: {}", path.display(), e),
                },
                Err(e) => log::warn!("Failed to read {}: {}", path.display(), e),
            }
        }

        snapshots.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
        Ok(snapshots)
    }

    pub async fn delete(&self, name: &str) -> Result<String> {
        let filepath = self.path_for(name)?;
        if !try_exists(&filepath).await? {
            anyhow::bail!("Document '{}' not found", name);
        }

        fs::remove_file(&filepath).await?;
        Ok(format!("Deleted '{}'", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::engine::HtmlEngine;
    use crate::page::PageId;
    use std::sync::{Mutex, OnceLock};
    use tempfile::TempDir;

    fn data_dir_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn sample_state() -> DocumentState {
        let mut doc = Document::new(HtmlEngine::new(), "<p>First</p>");
        doc.add_page_with(Some("<p>Second</p>".to_string())).unwrap();
        doc.update_settings(|s| s.footer_text = "Page footer".to_string());
        doc.state()
    }

    #[tokio::test]
    async fn test_save_load_and_delete_snapshot() {
        let data_dir = TempDir::new().unwrap();
        let manager = SnapshotManager::with_dir(data_dir.path());

        let message = manager.save("report", &sample_state()).await.unwrap();
        assert!(message.contains("Saved"));

        let loaded = manager.load("report").await.unwrap();
        assert_eq!(loaded.name, "report");
        assert_eq!(loaded.state.pages.len(), 2);
        assert_eq!(loaded.state.current_page_id, PageId(2));
        assert_eq!(loaded.state.settings.footer_text, "Page footer");

        let doc = Document::restore(HtmlEngine::new(), loaded.state).unwrap();
        assert_eq!(doc.current_page().content, "<p>Second</p>");

        let message = manager.delete("report").await.unwrap();
        assert!(message.contains("Deleted"));
        assert!(manager.load("report").await.is_err());
    }

    #[tokio::test]
    async fn test_resave_keeps_created_at() {
        let data_dir = TempDir::new().unwrap();
        let manager = SnapshotManager::with_dir(data_dir.path());

        manager.save("draft", &sample_state()).await.unwrap();
        let first = manager.load("draft").await.unwrap();
        manager.save("draft", &sample_state()).await.unwrap();
        let second = manager.load("draft").await.unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert!(second.modified_at >= first.modified_at);
    }

    #[tokio::test]
    async fn test_snapshot_json_layout() {
        let data_dir = TempDir::new().unwrap();
        let manager = SnapshotManager::with_dir(data_dir.path());
        manager.save("layout", &sample_state()).await.unwrap();

        let json = std::fs::read_to_string(data_dir.path().join("layout.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["currentPageId"], 2);
        assert_eq!(value["pages"][0]["content"], "<p>First</p>");
        assert_eq!(value["settings"]["footerText"], "Page footer");
        assert!(value["createdAt"].is_string());
    }

    #[tokio::test]
    async fn test_list_skips_broken_files() {
        let data_dir = TempDir::new().unwrap();
        let manager = SnapshotManager::with_dir(data_dir.path());
        manager.save("a", &sample_state()).await.unwrap();
        manager.save("b", &sample_state()).await.unwrap();
        std::fs::write(data_dir.path().join("broken.json"), "nope").unwrap();
        std::fs::write(data_dir.path().join("notes.txt"), "ignored").unwrap();

        let names: Vec<String> = manager
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"a".to_string()));
        assert!(names.contains(&"b".to_string()));
    }

    #[tokio::test]
    async fn test_rejects_path_names_and_missing_documents() {
        let data_dir = TempDir::new().unwrap();
        let manager = SnapshotManager::with_dir(data_dir.path());

        assert!(manager.save("../outside", &sample_state()).await.is_err());
        let error = manager.load("missing").await.unwrap_err();
        assert!(error.to_string().contains("not found"));
        assert!(manager.list().await.unwrap().is_empty());
    }

    #[test]
    fn test_data_dir_override() {
        let _guard = data_dir_lock().lock().unwrap();
        let previous = std::env::var("FOLIO_DATA_DIR").ok();
        std::env::set_var("FOLIO_DATA_DIR", "/tmp/folio-data");

        let manager = SnapshotManager::new().unwrap();
        assert_eq!(manager.dir(), Path::new("/tmp/folio-data/documents"));

        match previous {
            Some(value) => std::env::set_var("FOLIO_DATA_DIR", value),
            None => std::env::remove_var("FOLIO_DATA_DIR"),
        }
    }
}
