use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("photo is empty")]
    Empty,
    #[error("media io failed for `{path}`: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("no media stored under `{0}`")]
    NotFound(String),
}

/// Durable home for item photos. The returned reference is what gets stored as `photo_ref`.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn persist(&self, bytes: &[u8]) -> Result<String, MediaError>;
    async fn load(&self, photo_ref: &str) -> Result<Vec<u8>, MediaError>;
    async fn remove(&self, photo_ref: &str) -> Result<(), MediaError>;
}

/// Stores photos as `<root>/<YYYY-MM-DD>/<uuid>.jpg`.
pub struct FsMediaStore {
    root: PathBuf,
}

impl FsMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    async fn persist(&self, bytes: &[u8]) -> Result<String, MediaError> {
        if bytes.is_empty() {
            return Err(MediaError::Empty);
        }

        let dir = self.root.join(Utc::now().format("%Y-%m-%d").to_string());
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| MediaError::Io { path: dir.clone(), source })?;

        let path = dir.join(format!("{}.jpg", Uuid::new_v4()));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| MediaError::Io { path: path.clone(), source })?;

        Ok(path.to_string_lossy().into_owned())
    }

    async fn load(&self, photo_ref: &str) -> Result<Vec<u8>, MediaError> {
        let path = PathBuf::from(photo_ref);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(MediaError::NotFound(photo_ref.to_owned()))
            }
            Err(source) => Err(MediaError::Io { path, source }),
        }
    }

    async fn remove(&self, photo_ref: &str) -> Result<(), MediaError> {
        let path = PathBuf::from(photo_ref);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(MediaError::NotFound(photo_ref.to_owned()))
            }
            Err(source) => Err(MediaError::Io { path, source }),
        }
    }
}

/// Process-local photo store for tests and dry runs.
#[derive(Default)]
pub struct InMemoryMediaStore {
    photos: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryMediaStore {
    pub async fn len(&self) -> usize {
        self.photos.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn persist(&self, bytes: &[u8]) -> Result<String, MediaError> {
        if bytes.is_empty() {
            return Err(MediaError::Empty);
        }
        let mut photos = self.photos.write().await;
        let photo_ref = format!("memory://{}", Uuid::new_v4());
        photos.insert(photo_ref.clone(), bytes.to_vec());
        Ok(photo_ref)
    }

    async fn load(&self, photo_ref: &str) -> Result<Vec<u8>, MediaError> {
        let photos = self.photos.read().await;
        photos.get(photo_ref).cloned().ok_or_else(|| MediaError::NotFound(photo_ref.to_owned()))
    }

    async fn remove(&self, photo_ref: &str) -> Result<(), MediaError> {
        let mut photos = self.photos.write().await;
        match photos.remove(photo_ref) {
            Some(_) => Ok(()),
            None => Err(MediaError::NotFound(photo_ref.to_owned())),
        }
    }
}
