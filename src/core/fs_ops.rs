// src/core/fs_ops.rs
//! File system helpers backing the upload buckets

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::core::ports::BlobStore;
use crate::error::StoreResult;

pub struct FsOps;

impl FsOps {
    pub async fn ensure_dir_exists(path: &Path) -> StoreResult<()> {
        if !path.exists() {
            fs::create_dir_all(path).await?;
            info!("Created directory: {}", path.display());
        }
        Ok(())
    }

    /// Write bytes, creating parent directories as needed.
    pub async fn write_bytes(path: &Path, bytes: &[u8]) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            Self::ensure_dir_exists(parent).await?;
        }
        fs::write(path, bytes).await?;
        info!("Written file: {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    /// Unique on-disk path for an uploaded file inside `bucket_dir`.
    pub fn upload_path(bucket_dir: &Path, filename: &str) -> PathBuf {
        let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S%3f");
        bucket_dir.join(format!("{}_{}", stamp, sanitize_file_name(filename)))
    }
}

/// Upload buckets as sub-directories of a root folder.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, bucket: &str, filename: &str, bytes: &[u8]) -> StoreResult<String> {
        let bucket_dir = self.root.join(sanitize_file_name(bucket));
        let path = FsOps::upload_path(&bucket_dir, filename);
        FsOps::write_bytes(&path, bytes).await?;
        Ok(path.display().to_string())
    }
}

/// Keep a filename safe for any file system and URL.
pub fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}
