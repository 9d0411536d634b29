//! File storage backends for uploaded documents.

#[cfg(feature = "media-ftp")]
pub mod ftp;
#[cfg(feature = "media-local")]
pub mod local;

#[cfg(any(feature = "media-local", feature = "media-ftp"))]
mod naming {
    use std::path::Path;

    use domains::Upload;
    use uuid::Uuid;

    /// Collision-free stored name that keeps the original extension.
    pub(crate) fn stored_name(upload: &Upload) -> String {
        let ext = Path::new(&upload.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .or_else(|| {
                mime_guess::get_mime_extensions(&upload.content_type)
                    .and_then(|exts| exts.first())
                    .map(|e| e.to_string())
            });
        match ext {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        }
    }

    /// Browsers often send `application/octet-stream`; fall back to the extension.
    pub(crate) fn resolved_mime(upload: &Upload) -> String {
        if upload.content_type == mime::APPLICATION_OCTET_STREAM {
            mime_guess::from_path(&upload.file_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        } else {
            upload.content_type.essence_str().to_string()
        }
    }

}

#[cfg(any(feature = "media-local", feature = "media-ftp"))]
pub(crate) use naming::{resolved_mime, stored_name};
