//! FTP implementation of `FileStorage`.
//!
//! suppaftp's stream is blocking, so every transfer opens its own session
//! inside `spawn_blocking`.

use std::io::Cursor;

use async_trait::async_trait;
use suppaftp::types::FileType;
use suppaftp::FtpStream;

use domains::{DomainError, FileStorage, Result, StoredFile, Upload};

use super::{resolved_mime, stored_name};

#[derive(Debug, Clone)]
pub struct FtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Directory on the server that maps to `public_url`
    pub remote_dir: String,
    /// HTTP base under which `remote_dir` is published
    pub public_url: String,
}

pub struct FtpFileStorage {
    config: FtpConfig,
}

impl FtpFileStorage {
    pub fn new(config: FtpConfig) -> Self {
        Self { config }
    }
}

fn remote_path(remote_dir: &str, folder: &str, name: &str) -> String {
    let dir = remote_dir.trim_end_matches('/');
    format!("{dir}/{folder}/{name}")
}

fn connect(config: &FtpConfig) -> std::result::Result<FtpStream, suppaftp::FtpError> {
    let mut ftp = FtpStream::connect((config.host.as_str(), config.port))?;
    ftp.login(config.user.as_str(), config.password.as_str())?;
    ftp.transfer_type(FileType::Binary)?;
    Ok(ftp)
}

/// Walks into `path` one segment at a time, creating missing directories.
fn enter_dir(ftp: &mut FtpStream, path: &str) -> std::result::Result<(), suppaftp::FtpError> {
    if path.starts_with('/') {
        ftp.cwd("/")?;
    }
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if ftp.cwd(segment).is_err() {
            ftp.mkdir(segment)?;
            ftp.cwd(segment)?;
        }
    }
    Ok(())
}

async fn blocking<T, F>(job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> std::result::Result<T, suppaftp::FtpError> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(DomainError::internal)?
        .map_err(|err| {
            tracing::error!(error = %err, "ftp transfer failed");
            DomainError::internal(err)
        })
}

#[async_trait]
impl FileStorage for FtpFileStorage {
    async fn save(&self, upload: Upload) -> Result<StoredFile> {
        let name = stored_name(&upload);
        let mime_type = resolved_mime(&upload);
        let dir = format!("{}/{}", self.config.remote_dir.trim_end_matches('/'), upload.folder);
        let size = upload.data.len() as i64;

        let config = self.config.clone();
        let data = upload.data.clone();
        let remote_name = name.clone();
        blocking(move || {
            let mut ftp = connect(&config)?;
            enter_dir(&mut ftp, &dir)?;
            ftp.put_file(&remote_name, &mut Cursor::new(data))?;
            ftp.quit()
        })
        .await?;

        tracing::debug!(host = %self.config.host, %name, size, "upload stored over ftp");
        Ok(StoredFile {
            file_path: remote_path(&self.config.remote_dir, &upload.folder, &name),
            public_url: format!(
                "{}/{}/{}",
                self.config.public_url.trim_end_matches('/'),
                upload.folder,
                name
            ),
            file_name: upload.file_name,
            file_size: size,
            mime_type,
        })
    }

    async fn delete(&self, file_path: &str) -> Result<()> {
        let config = self.config.clone();
        let path = file_path.to_string();
        blocking(move || {
            let mut ftp = connect(&config)?;
            if let Err(err) = ftp.rm(&path) {
                tracing::warn!(error = %err, %path, "ftp delete failed");
            }
            ftp.quit()
        })
        .await
    }
}
