use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{io::AsyncWriteExt, sync::RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::accounts::repo_types::UserRecord;

/// Full persisted snapshot: every user plus the next id to hand out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default = "first_id")]
    pub next_id: u64,
}

fn first_id() -> u64 {
    1
}

impl Default for Store {
    fn default() -> Self {
        Self {
            users: Vec::new(),
            next_id: first_id(),
        }
    }
}

impl Store {
    /// Raise `next_id` above the highest existing id if a file says otherwise.
    fn normalized(mut self) -> Self {
        let floor = self.users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        if self.next_id < floor {
            warn!(next_id = self.next_id, floor, "nextId behind existing ids, raising");
            self.next_id = floor;
        }
        self
    }

    pub fn find_by_email(&self, email: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.email == email)
    }

    pub fn find_by_id(&self, id: u64) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn find_by_id_mut(&mut self, id: u64) -> Option<&mut UserRecord> {
        self.users.iter_mut().find(|u| u.id == id)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Never fails: missing or unreadable state yields the empty default.
    async fn load(&self) -> Store;
    async fn save(&self, store: &Store) -> Result<(), StoreError>;
}

/// Record store backed by a single JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Per-save scratch file next to the target, so concurrent saves never
    /// share one.
    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "users.json".into());
        name.push(format!(".{}.tmp", Uuid::new_v4()));
        self.path.with_file_name(name)
    }

    async fn ensure_parent(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Writes the empty document only if no file exists yet; a store written
    /// in the meantime is left alone.
    async fn create_default(&self) -> Result<(), StoreError> {
        self.ensure_parent().await?;
        let file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await;
        let mut file = match file {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        file.write_all(&serde_json::to_vec_pretty(&Store::default())?)
            .await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn load(&self) -> Store {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no user store yet, creating empty one");
                if let Err(e) = self.create_default().await {
                    error!(error = %e, path = %self.path.display(), "failed to create user store");
                }
                return Store::default();
            }
            Err(e) => {
                error!(error = %e, path = %self.path.display(), "failed to read user store");
                return Store::default();
            }
        };

        match serde_json::from_str::<Store>(&raw) {
            Ok(store) => store.normalized(),
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "user store unparseable, using empty default");
                Store::default()
            }
        }
    }

    async fn save(&self, store: &Store) -> Result<(), StoreError> {
        self.ensure_parent().await?;
        let body = serde_json::to_vec_pretty(store)?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, body).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!(users = store.users.len(), next_id = store.next_id, "user store saved");
        Ok(())
    }
}

/// In-process store, used where no file should be touched.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Option<Store>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn load(&self) -> Store {
        let mut guard = self.inner.write().await;
        guard.get_or_insert_with(Store::default).clone().normalized()
    }

    async fn save(&self, store: &Store) -> Result<(), StoreError> {
        *self.inner.write().await = Some(store.clone());
        Ok(())
    }
}
