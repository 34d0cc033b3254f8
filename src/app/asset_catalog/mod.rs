// Asset catalog - Uploaded source videos and their identifiers

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;

/// Public URL prefix of uploaded files
pub const UPLOADS_PREFIX: &str = "/uploads";

const MAX_ID_ATTEMPTS: usize = 16;

/// A freshly created upload file waiting for its bytes
#[derive(Debug)]
pub struct UploadTarget {
    pub id: String,
    pub path: PathBuf,
    pub file: File,
}

/// Catalog of uploaded assets, keyed by their opaque id
pub struct AssetCatalog {
    uploads_dir: PathBuf,
    assets: Mutex<HashMap<String, Arc<SourceAsset>>>,
}

impl AssetCatalog {
    pub fn new(uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
            assets: Mutex::new(HashMap::new()),
        }
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Public URL of an uploaded asset
    pub fn public_url(id: &str) -> String {
        format!("{}/{}", UPLOADS_PREFIX, id)
    }

    /// Look up an uploaded asset.
    ///
    /// The same `Arc` is handed out for every request so the probed duration
    /// is shared.
    pub fn open(&self, id: &str) -> DomainResult<Arc<SourceAsset>> {
        validate_identifier(id)?;
        let path = self.uploads_dir.join(id);
        let mut assets = self.lock();

        if !path.is_file() {
            assets.remove(id);
            return Err(DomainError::NotFound(format!("No uploaded file named {}", id)));
        }

        let asset = assets
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(SourceAsset::new(id, path)));
        Ok(Arc::clone(asset))
    }

    /// Create an empty upload file under a fresh id.
    ///
    /// Ids are `<unix-millis>_<n>` plus the original extension. Files are
    /// created exclusively; a taken id is regenerated.
    pub async fn create_upload(&self, original_name: &str) -> DomainResult<UploadTarget> {
        tokio::fs::create_dir_all(&self.uploads_dir).await?;
        let extension = upload_extension(original_name);

        for _ in 0..MAX_ID_ATTEMPTS {
            let id = format!("{}_{}{}", Utc::now().timestamp_millis(), random_suffix(), extension);
            let path = self.uploads_dir.join(&id);
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => {
                    debug!(asset = %id, "Created upload file");
                    return Ok(UploadTarget { id, path, file });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(DomainError::FsFail(
            "Could not allocate a unique upload name".to_string(),
        ))
    }

    /// Flush a completed upload and make it available to [`open`](Self::open)
    pub async fn finish_upload(&self, mut target: UploadTarget) -> DomainResult<Arc<SourceAsset>> {
        target.file.flush().await?;
        target.file.sync_all().await?;
        drop(target.file);
        info!(asset = %target.id, "Stored upload");
        self.open(&target.id)
    }

    /// Remove an upload that failed midway
    pub async fn discard_upload(&self, target: UploadTarget) {
        drop(target.file);
        if let Err(e) = tokio::fs::remove_file(&target.path).await {
            warn!(asset = %target.id, error = %e, "Failed to remove incomplete upload");
        }
    }

    /// Store `bytes` as a new upload
    pub async fn store_upload(
        &self,
        original_name: &str,
        bytes: &[u8],
    ) -> DomainResult<Arc<SourceAsset>> {
        let mut target = self.create_upload(original_name).await?;
        if let Err(e) = target.file.write_all(bytes).await {
            self.discard_upload(target).await;
            return Err(e.into());
        }
        self.finish_upload(target).await
    }

    /// Copy a local file into the catalog
    pub async fn import(&self, source: &Path) -> DomainResult<Arc<SourceAsset>> {
        if !source.is_file() {
            return Err(DomainError::NotFound(format!(
                "No such file: {}",
                source.display()
            )));
        }
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let target = self.create_upload(&name).await?;
        if let Err(e) = tokio::fs::copy(source, &target.path).await {
            self.discard_upload(target).await;
            return Err(e.into());
        }
        self.finish_upload(target).await
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<SourceAsset>>> {
        self.assets.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Extension of the client's file name, kept only when plainly alphanumeric
fn upload_extension(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}

fn random_suffix() -> u128 {
    uuid::Uuid::new_v4().as_u128() % 10_000
}
