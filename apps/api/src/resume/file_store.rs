//! On-disk persistence of resume binaries.
//!
//! Files live flat in one upload directory, named
//! `resume-{studentId}-{YYYYMMDDHHMMSS}-{originalFilename}`. The store knows
//! nothing about student records.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;

/// Where `save` put a file.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub stored_name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

pub fn stored_file_name(student_id: Uuid, at: DateTime<Utc>, original_filename: &str) -> String {
    format!(
        "resume-{}-{}-{}",
        student_id,
        at.format("%Y%m%d%H%M%S"),
        original_filename
    )
}

impl LocalFileStore {
    /// Opens the store, creating the upload directory if needed.
    pub async fn open(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .with_context(|| format!("Failed to create upload directory {}", root.display()))?;
        info!("Resume upload directory: {}", root.display());
        Ok(Self { root })
    }

    /// Path `save` would write for these arguments.
    pub fn path_for(
        &self,
        student_id: Uuid,
        original_filename: &str,
        at: DateTime<Utc>,
    ) -> PathBuf {
        self.root
            .join(stored_file_name(student_id, at, original_filename))
    }

    /// Moves an existing file out of the way so a write to `path` cannot
    /// clobber it. Returns the holding path, or `None` if nothing was there.
    pub async fn set_aside(&self, path: &Path) -> Result<Option<PathBuf>, AppError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let held = self.root.join(format!(".{name}.prev"));
        match fs::rename(path, &held).await {
            Ok(()) => {
                debug!("Set aside {} as {}", path.display(), held.display());
                Ok(Some(held))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to set aside {}: {e}",
                path.display()
            ))),
        }
    }

    /// Puts a file moved by `set_aside` back, replacing whatever is at `path`.
    pub async fn restore(&self, held: &Path, path: &Path) -> Result<(), AppError> {
        fs::rename(held, path).await.map_err(|e| {
            AppError::Storage(format!(
                "Failed to restore {} from {}: {e}",
                path.display(),
                held.display()
            ))
        })
    }

    /// Writes `content` under a fresh name. The bytes are flushed to disk under
    /// a temporary name first, so the final path never holds a partial file.
    pub async fn save(
        &self,
        student_id: Uuid,
        original_filename: &str,
        content: &[u8],
        at: DateTime<Utc>,
    ) -> Result<StoredFile, AppError> {
        let stored_name = stored_file_name(student_id, at, original_filename);
        let path = self.path_for(student_id, original_filename, at);
        let tmp_path = self.root.join(format!(".{stored_name}.part"));

        if let Err(e) = write_synced(&tmp_path, content).await {
            remove_quietly(&tmp_path).await;
            return Err(AppError::Storage(format!(
                "Failed to write {}: {e}",
                tmp_path.display()
            )));
        }
        if let Err(e) = fs::rename(&tmp_path, &path).await {
            remove_quietly(&tmp_path).await;
            return Err(AppError::Storage(format!(
                "Failed to move resume into {}: {e}",
                path.display()
            )));
        }

        debug!("Stored {} bytes at {}", content.len(), path.display());
        Ok(StoredFile { stored_name, path })
    }

    /// Best-effort removal. A missing file is fine; other failures are logged
    /// and swallowed. Returns whether a file was actually removed.
    pub async fn delete(&self, path: &Path) -> bool {
        match fs::remove_file(path).await {
            Ok(()) => {
                debug!("Removed {}", path.display());
                true
            }
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                warn!("Could not delete resume file {}: {e}", path.display());
                false
            }
        }
    }

    pub async fn read(&self, path: &Path) -> Result<Vec<u8>, AppError> {
        fs::read(path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                AppError::NotFound("Resume file not found on disk".to_string())
            } else {
                AppError::Storage(format!("Failed to read {}: {e}", path.display()))
            }
        })
    }
}

async fn write_synced(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(content).await?;
    file.sync_all().await
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!("Could not remove temporary file {}: {e}", path.display());
        }
    }
}
