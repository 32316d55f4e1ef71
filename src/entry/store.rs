use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

/// Title format used when the caller supplies none.
const TITLE_DATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// A saved note.
///
/// Identity is stable once persisted; updates mutate title/text only,
/// never the date or coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub date: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Fields for a new note; everything optional defaults at save time.
#[derive(Debug, Clone, Default)]
pub struct NewEntry {
    /// Defaults to the creation date formatted `%Y/%m/%d %H:%M:%S`
    pub title: Option<String>,
    pub text: String,
    /// Defaults to now
    pub date: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("entry {0} not found")]
    NotFound(Uuid),

    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Local persistence of dictated notes.
#[async_trait::async_trait]
pub trait EntryStore: Send + Sync {
    /// All entries, sorted by date ascending.
    async fn find_all(&self) -> Result<Vec<Entry>, StorageError>;

    async fn save(&self, draft: NewEntry) -> Result<Entry, StorageError>;

    /// Update title and/or text. Date and coordinates are immutable.
    async fn update(
        &self,
        id: Uuid,
        title: Option<String>,
        text: Option<String>,
    ) -> Result<Entry, StorageError>;

    async fn delete(&self, id: Uuid) -> Result<(), StorageError>;
}

/// JSON-file entry store.
///
/// The whole collection is loaded at open and rewritten on every
/// mutation; fine for a personal notes file, and the format stays
/// an implementation detail.
pub struct JsonEntryStore {
    path: PathBuf,
    entries: RwLock<Vec<Entry>>,
}

impl JsonEntryStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        let entries: Vec<Entry> = if tokio::fs::try_exists(&path).await? {
            let raw = tokio::fs::read(&path).await?;
            serde_json::from_slice(&raw)?
        } else {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            Vec::new()
        };

        info!(
            "entry store opened: {} ({} entries)",
            path.display(),
            entries.len()
        );

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    async fn persist(&self, entries: &[Entry]) -> Result<(), StorageError> {
        let raw = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl EntryStore for JsonEntryStore {
    async fn find_all(&self) -> Result<Vec<Entry>, StorageError> {
        let entries = self.entries.read().await;
        let mut sorted: Vec<Entry> = entries.clone();
        sorted.sort_by_key(|e| e.date);
        Ok(sorted)
    }

    async fn save(&self, draft: NewEntry) -> Result<Entry, StorageError> {
        let date = draft.date.unwrap_or_else(Utc::now);
        let title = match draft.title {
            Some(title) if !title.trim().is_empty() => title,
            _ => date.format(TITLE_DATE_FORMAT).to_string(),
        };

        let entry = Entry {
            id: Uuid::new_v4(),
            title,
            text: draft.text,
            date,
            latitude: draft.latitude,
            longitude: draft.longitude,
        };

        let mut entries = self.entries.write().await;
        entries.push(entry.clone());
        self.persist(&entries).await?;

        Ok(entry)
    }

    async fn update(
        &self,
        id: Uuid,
        title: Option<String>,
        text: Option<String>,
    ) -> Result<Entry, StorageError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(StorageError::NotFound(id))?;

        if let Some(title) = title {
            entry.title = title;
        }
        if let Some(text) = text {
            entry.text = text;
        }
        let updated = entry.clone();

        self.persist(&entries).await?;
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StorageError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| e.id != id);
        if entries.len() == before {
            return Err(StorageError::NotFound(id));
        }

        self.persist(&entries).await?;
        Ok(())
    }
}
