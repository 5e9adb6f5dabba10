use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

/// Image extensions accepted for pro-todo uploads.
const ALLOWED_IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpe", "jpeg", "png", "gif", "svg", "bmp"];

/// Request body ceiling for multipart uploads.
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A file received in a multipart request, held in memory until stored.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub data: Vec<u8>,
}

/// Writes uploaded images into a destination directory and hands back the
/// stored filenames.
#[derive(Clone)]
pub struct ImageStore {
    dest: PathBuf,
}

impl ImageStore {
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self { dest: dest.into() }
    }

    pub fn path_of(&self, stored_name: &str) -> PathBuf {
        self.dest.join(stored_name)
    }

    /// Stores every file, or nothing: all names are validated before the
    /// first write, and already-written files are removed if a later write
    /// fails.
    pub async fn save_all(&self, files: &[UploadedFile]) -> Result<Vec<String>, UploadError> {
        let mut named = Vec::with_capacity(files.len());
        for file in files {
            named.push((stored_name_for(&file.name)?, file));
        }

        tokio::fs::create_dir_all(&self.dest).await?;

        let mut stored = Vec::with_capacity(named.len());
        for (stored_name, file) in named {
            if let Err(e) = tokio::fs::write(self.dest.join(&stored_name), &file.data).await {
                self.remove_all(&stored).await;
                return Err(e.into());
            }
            tracing::debug!(filename = %stored_name, bytes = file.data.len(), "stored upload");
            stored.push(stored_name);
        }
        Ok(stored)
    }

    /// Best-effort removal, used to roll back after a failed persist.
    pub async fn remove_all(&self, stored_names: &[String]) {
        for name in stored_names {
            if let Err(e) = tokio::fs::remove_file(self.dest.join(name)).await {
                tracing::warn!(filename = %name, error = ?e, "failed to remove stored upload");
            }
        }
    }
}

/// Derives a unique on-disk name, keeping a sanitized stem for readability.
fn stored_name_for(original: &str) -> Result<String, UploadError> {
    // Drop any client-supplied directory components.
    let base = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    let (stem, extension) = match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, ext.to_ascii_lowercase()),
        _ => return Err(UploadError::UnsupportedFileType(original.to_string())),
    };

    if !ALLOWED_IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(UploadError::UnsupportedFileType(original.to_string()));
    }

    let stem: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();

    Ok(format!("{stem}-{}.{extension}", Uuid::new_v4()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_image_extensions() {
        for name in ["photo.png", "photo.JPG", "scan.jpeg", "pic.gif", "x.bmp"] {
            assert!(stored_name_for(name).is_ok(), "{name} should be accepted");
        }
    }

    #[test]
    fn rejects_non_image_extensions_and_bare_names() {
        for name in ["run.exe", "notes.txt", "archive.tar.xz", "noextension", ".png"] {
            assert!(
                matches!(stored_name_for(name), Err(UploadError::UnsupportedFileType(_))),
                "{name} should be rejected"
            );
        }
    }

    #[test]
    fn stored_name_is_sanitized_and_unique() {
        let a = stored_name_for("../../etc/my photo!.png").unwrap();
        let b = stored_name_for("../../etc/my photo!.png").unwrap();

        assert!(a.starts_with("my_photo_-"));
        assert!(a.ends_with(".png"));
        assert!(!a.contains('/'));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn save_all_writes_files_and_remove_all_deletes_them() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let files = vec![
            UploadedFile { name: "a.png".into(), data: b"png-bytes".to_vec() },
            UploadedFile { name: "b.jpg".into(), data: b"jpg-bytes".to_vec() },
        ];
        let stored = store.save_all(&files).await.unwrap();
        assert_eq!(stored.len(), 2);
        for name in &stored {
            assert!(store.path_of(name).exists());
        }

        store.remove_all(&stored).await;
        for name in &stored {
            assert!(!store.path_of(name).exists());
        }
    }

    #[tokio::test]
    async fn save_all_rejects_everything_if_one_name_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let files = vec![
            UploadedFile { name: "a.png".into(), data: b"ok".to_vec() },
            UploadedFile { name: "evil.exe".into(), data: b"no".to_vec() },
        ];
        assert!(matches!(
            store.save_all(&files).await,
            Err(UploadError::UnsupportedFileType(_))
        ));
        // Nothing may hit the disk when validation fails.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
