// src/services/storage.rs

//! Object storage for exam documents and student answers.

use std::path::PathBuf;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("static regex"));

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stores uploaded bytes and hands back a public URL.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(&self, bytes: &[u8], file_name: &str) -> Result<String, StorageError>;
}

/// Writes objects under a local directory served at `/uploads`.
pub struct LocalObjectStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStorage {
    pub async fn new(
        root: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn object_name(file_name: &str) -> String {
        format!("{}-{}", Uuid::new_v4(), sanitize_file_name(file_name))
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn upload(&self, bytes: &[u8], file_name: &str) -> Result<String, StorageError> {
        let object = Self::object_name(file_name);
        let path = self.root.join(&object);

        if let Err(e) = fs::write(&path, bytes).await {
            let _ = fs::remove_file(&path).await;
            return Err(e.into());
        }

        tracing::debug!("Stored {} bytes as {}", bytes.len(), object);
        Ok(format!("{}/uploads/{}", self.public_base_url, object))
    }
}

/// Reduces a client-supplied name to a flat, URL-safe file name.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned = UNSAFE_CHARS.replace_all(base, "_");
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        return "file".to_string();
    }
    cleaned.chars().take(100).collect()
}
