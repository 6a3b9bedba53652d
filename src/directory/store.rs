//! Durable storage of the last selected project

use async_trait::async_trait;
use log::debug;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::ProjectId;

/// Key the selection is stored under
pub const SELECTED_PROJECT_KEY: &str = "selectedProjectId";

/// Where the directory remembers the current project between sessions
#[async_trait]
pub trait SelectionStore: Send + Sync {
    /// The remembered project, if any. Unreadable state counts as none.
    async fn load(&self) -> Option<ProjectId>;

    async fn save(&self, id: &ProjectId) -> Result<()>;
}

/// Keeps the selection for the lifetime of the value
#[derive(Debug, Default)]
pub struct MemorySelectionStore {
    value: Mutex<Option<ProjectId>>,
}

impl MemorySelectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SelectionStore for MemorySelectionStore {
    async fn load(&self) -> Option<ProjectId> {
        self.value.lock().await.clone()
    }

    async fn save(&self, id: &ProjectId) -> Result<()> {
        *self.value.lock().await = Some(id.clone());
        Ok(())
    }
}

/// Stores the selection in a small JSON object on disk.
///
/// Other keys already present in the file are preserved.
#[derive(Debug, Clone)]
pub struct FileSelectionStore {
    path: PathBuf,
}

impl FileSelectionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_map(&self) -> Option<Map<String, Value>> {
        let bytes = tokio::fs::read(&self.path).await.ok()?;
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) => Some(map),
            Ok(_) | Err(_) => {
                debug!("ignoring unreadable selection file {}", self.path.display());
                None
            }
        }
    }
}

#[async_trait]
impl SelectionStore for FileSelectionStore {
    async fn load(&self) -> Option<ProjectId> {
        let map = self.read_map().await?;
        map.get(SELECTED_PROJECT_KEY)
            .and_then(Value::as_str)
            .map(ProjectId::from)
    }

    async fn save(&self, id: &ProjectId) -> Result<()> {
        let mut map = self.read_map().await.unwrap_or_default();
        map.insert(
            SELECTED_PROJECT_KEY.to_string(),
            Value::String(id.to_string()),
        );

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, serde_json::to_vec_pretty(&Value::Object(map))?).await?;
        Ok(())
    }
}
