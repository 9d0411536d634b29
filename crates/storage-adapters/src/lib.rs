//! # storage-adapters
//!
//! Persistence and file storage behind the `domains` ports.
//!
//! - `db-postgres`: one repository per port over a shared `PgPool`
//! - `media-local`: uploads on the local filesystem
//! - `media-ftp`: uploads on a remote FTP server

pub mod media;
#[cfg(feature = "db-postgres")]
pub mod postgres;

#[cfg(feature = "media-ftp")]
pub use media::ftp::{FtpConfig, FtpFileStorage};
#[cfg(feature = "media-local")]
pub use media::local::LocalFileStorage;
