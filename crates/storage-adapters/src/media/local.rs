//! Local filesystem implementation of `FileStorage`.
//! Files land in `<root>/<folder>/<uuid>.<ext>` and are served under `url_prefix`.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use domains::{DomainError, FileStorage, Result, StoredFile, Upload};

use super::{resolved_mime, stored_name};

pub struct LocalFileStorage {
    /// Root directory for all uploads (e.g., "./uploads")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/uploads")
    url_prefix: String,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        let url_prefix: String = url_prefix.into();
        Self {
            root_path: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save(&self, upload: Upload) -> Result<StoredFile> {
        let name = stored_name(&upload);
        let mime_type = resolved_mime(&upload);

        let dir = self.root_path.join(&upload.folder);
        fs::create_dir_all(&dir).await.map_err(DomainError::internal)?;
        let target = dir.join(&name);
        fs::write(&target, &upload.data).await.map_err(DomainError::internal)?;

        tracing::debug!(path = %target.display(), size = upload.data.len(), "upload stored");
        Ok(StoredFile {
            file_path: target.to_string_lossy().into_owned(),
            public_url: format!("{}/{}/{}", self.url_prefix, upload.folder, name),
            file_name: upload.file_name,
            file_size: upload.data.len() as i64,
            mime_type,
        })
    }

    async fn delete(&self, file_path: &str) -> Result<()> {
        match fs::remove_file(file_path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(DomainError::internal(err)),
        }
    }
}
