//! Profile picture storage.
//!
//! Pictures are written to a local directory that the router serves under
//! `/uploads`. File names are generated here, never taken from the client.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

use grace_codex_core::UserId;

/// Accepted picture extensions.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Errors that can occur while storing a picture.
#[derive(Debug, Error)]
pub enum AvatarError {
    #[error("no file was uploaded")]
    Empty,

    #[error("picture must be at most {max} bytes")]
    TooLarge { max: usize },

    #[error("unsupported picture type: {0}")]
    UnsupportedType(String),

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
}

impl AvatarError {
    /// Whether the client sent something unacceptable (as opposed to a
    /// server-side failure).
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

/// Local directory holding profile pictures.
#[derive(Debug, Clone)]
pub struct AvatarStorage {
    dir: PathBuf,
    max_bytes: usize,
}

impl AvatarStorage {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub const fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Store a picture for `user_id` and return its file name.
    ///
    /// # Errors
    ///
    /// Returns a client error for empty, oversized or unsupported files and
    /// `AvatarError::Io` if the file cannot be written.
    pub async fn save(
        &self,
        user_id: UserId,
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, AvatarError> {
        if bytes.is_empty() {
            return Err(AvatarError::Empty);
        }
        if bytes.len() > self.max_bytes {
            return Err(AvatarError::TooLarge {
                max: self.max_bytes,
            });
        }

        let extension = extension_of(original_name.unwrap_or_default())?;
        let file_name = format!("user-{user_id}-{}.{extension}", Uuid::new_v4().simple());

        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(&file_name), bytes).await?;

        tracing::info!(%user_id, file = %file_name, "profile picture stored");
        Ok(file_name)
    }

    /// Remove a stored picture. Missing files are not an error.
    ///
    /// # Errors
    ///
    /// Returns `AvatarError::Io` if the file exists but cannot be removed.
    pub async fn remove(&self, file_name: &str) -> Result<(), AvatarError> {
        // Only names produced by `save` live here.
        if file_name.contains(['/', '\\']) || file_name.starts_with('.') {
            tracing::warn!(file = %file_name, "refusing to remove suspicious picture path");
            return Ok(());
        }

        match tokio::fs::remove_file(self.dir.join(file_name)).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

fn extension_of(name: &str) -> Result<String, AvatarError> {
    let extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(AvatarError::UnsupportedType(name.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("me.PNG").unwrap(), "png");
        assert_eq!(extension_of("a.b.webp").unwrap(), "webp");
        assert!(extension_of("script.svg").is_err());
        assert!(extension_of("noext").is_err());
    }

    #[tokio::test]
    async fn test_save_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = AvatarStorage::new(dir.path().join("uploads"), 16);

        let name = storage
            .save(UserId::new(3), Some("face.jpg"), b"not really a jpg")
            .await
            .unwrap();
        assert!(name.starts_with("user-3-"));
        assert!(name.ends_with(".jpg"));
        assert!(storage.dir().join(&name).exists());

        storage.remove(&name).await.unwrap();
        assert!(!storage.dir().join(&name).exists());
        // Second removal is a no-op.
        storage.remove(&name).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_rejections() {
        let dir = tempfile::tempdir().unwrap();
        let storage = AvatarStorage::new(dir.path(), 4);

        assert!(matches!(
            storage.save(UserId::new(1), Some("a.png"), b"").await,
            Err(AvatarError::Empty)
        ));
        assert!(matches!(
            storage.save(UserId::new(1), Some("a.png"), b"12345").await,
            Err(AvatarError::TooLarge { max: 4 })
        ));
        assert!(matches!(
            storage.save(UserId::new(1), Some("a.exe"), b"1").await,
            Err(AvatarError::UnsupportedType(_))
        ));
    }
}
