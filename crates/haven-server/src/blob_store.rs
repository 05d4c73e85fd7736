//! Object store for profile photos.
//!
//! Photos live under `<base>/profile-pictures/<uid>/<uuid>` and are served
//! back at `<public base url>/blob/<uid>/<uuid>`.

use std::path::{Component, Path, PathBuf};

use haven_shared::UserId;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ServerError;

const PHOTO_DIR: &str = "profile-pictures";

/// Image formats accepted for profile photos, detected by magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(Self::Png)
        } else {
            None
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// Verify that a resolved path stays within the base directory.
fn ensure_within(base: &Path, target: &Path) -> Result<PathBuf, ServerError> {
    let mut resolved = base.to_path_buf();
    for component in target.strip_prefix(base).unwrap_or(target).components() {
        match component {
            Component::Normal(c) => resolved.push(c),
            Component::ParentDir => {
                return Err(ServerError::BadRequest("Path traversal detected".to_string()));
            }
            _ => {}
        }
    }
    if !resolved.starts_with(base) {
        return Err(ServerError::BadRequest("Path traversal detected".to_string()));
    }
    Ok(resolved)
}

#[derive(Debug, Clone)]
pub struct BlobStore {
    base_path: PathBuf,
    max_size: usize,
    public_base_url: String,
}

impl BlobStore {
    pub async fn new(
        base_path: PathBuf,
        max_size: usize,
        public_base_url: impl Into<String>,
    ) -> Result<Self, ServerError> {
        fs::create_dir_all(base_path.join(PHOTO_DIR))
            .await
            .map_err(|e| {
                ServerError::BlobStorage(format!(
                    "Failed to create blob directory '{}': {}",
                    base_path.display(),
                    e
                ))
            })?;
        let base_path = base_path.canonicalize().unwrap_or(base_path);

        info!(path = %base_path.display(), "Blob store initialized");

        Ok(Self {
            base_path,
            max_size,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Durable URL for a stored photo.
    pub fn url_for(&self, user: UserId, id: Uuid) -> String {
        format!("{}/blob/{}/{}", self.public_base_url, user, id)
    }

    /// Store a JPEG or PNG for `user` and return its id.
    pub async fn store_photo(&self, user: UserId, data: &[u8]) -> Result<Uuid, ServerError> {
        if data.is_empty() {
            return Err(ServerError::BadRequest("Empty upload".to_string()));
        }
        if data.len() > self.max_size {
            return Err(ServerError::BlobTooLarge {
                size: data.len(),
                max: self.max_size,
            });
        }
        let kind = ImageKind::sniff(data).ok_or(ServerError::UnsupportedMedia)?;

        let dir = self.user_dir(user)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| ServerError::BlobStorage(format!("Failed to create {}: {e}", dir.display())))?;

        let id = Uuid::new_v4();
        let path = self.photo_path(user, id)?;
        fs::write(&path, data)
            .await
            .map_err(|e| ServerError::BlobStorage(format!("Failed to write photo {id}: {e}")))?;

        debug!(user_id = %user, id = %id, size = data.len(), kind = kind.content_type(), "Stored photo");
        Ok(id)
    }

    /// Photo bytes and their content type.
    pub async fn get_photo(
        &self,
        user: UserId,
        id: Uuid,
    ) -> Result<(Vec<u8>, &'static str), ServerError> {
        let path = self.photo_path(user, id)?;
        if !path.exists() {
            return Err(ServerError::BlobNotFound(id));
        }

        let data = fs::read(&path)
            .await
            .map_err(|e| ServerError::BlobStorage(format!("Failed to read photo {id}: {e}")))?;
        let content_type = ImageKind::sniff(&data)
            .map(|k| k.content_type())
            .unwrap_or("application/octet-stream");
        Ok((data, content_type))
    }

    pub async fn delete_photo(&self, user: UserId, id: Uuid) -> Result<(), ServerError> {
        let path = self.photo_path(user, id)?;
        if !path.exists() {
            return Err(ServerError::BlobNotFound(id));
        }
        fs::remove_file(&path)
            .await
            .map_err(|e| ServerError::BlobStorage(format!("Failed to delete photo {id}: {e}")))?;
        debug!(user_id = %user, id = %id, "Deleted photo");
        Ok(())
    }

    /// Parse a URL produced by [`url_for`](Self::url_for) back into its parts.
    pub fn parse_url(&self, url: &str) -> Option<(UserId, Uuid)> {
        let rest = url.strip_prefix(&self.public_base_url)?.strip_prefix("/blob/")?;
        let (user, id) = rest.split_once('/')?;
        Some((user.parse().ok()?, id.parse().ok()?))
    }

    fn user_dir(&self, user: UserId) -> Result<PathBuf, ServerError> {
        let raw = self.base_path.join(PHOTO_DIR).join(user.to_string());
        ensure_within(&self.base_path, &raw)
    }

    fn photo_path(&self, user: UserId, id: Uuid) -> Result<PathBuf, ServerError> {
        Ok(self.user_dir(user)?.join(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3];

    async fn test_store() -> (BlobStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = BlobStore::new(dir.path().to_path_buf(), 1024, "http://localhost:8080/")
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_store_and_get() {
        let (store, dir) = test_store().await;
        let user = UserId::new();

        let id = store.store_photo(user, PNG).await.unwrap();
        let (data, content_type) = store.get_photo(user, id).await.unwrap();
        assert_eq!(data, PNG);
        assert_eq!(content_type, "image/png");
        assert!(dir
            .path()
            .join(PHOTO_DIR)
            .join(user.to_string())
            .join(id.to_string())
            .exists());
    }

    #[tokio::test]
    async fn test_url_round_trip() {
        let (store, _dir) = test_store().await;
        let user = UserId::new();
        let id = store.store_photo(user, JPEG).await.unwrap();

        let url = store.url_for(user, id);
        assert_eq!(url, format!("http://localhost:8080/blob/{user}/{id}"));
        assert_eq!(store.parse_url(&url), Some((user, id)));
        assert_eq!(store.parse_url("https://elsewhere/blob/x/y"), None);
    }

    #[tokio::test]
    async fn test_rejects_non_images_and_oversize() {
        let (store, _dir) = test_store().await;
        let user = UserId::new();
        assert!(matches!(
            store.store_photo(user, b"GIF89a").await,
            Err(ServerError::UnsupportedMedia)
        ));
        assert!(matches!(
            store.store_photo(user, b"").await,
            Err(ServerError::BadRequest(_))
        ));
        let mut big = JPEG.to_vec();
        big.resize(2048, 0);
        assert!(matches!(
            store.store_photo(user, &big).await,
            Err(ServerError::BlobTooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn test_photos_are_scoped_per_user() {
        let (store, _dir) = test_store().await;
        let owner = UserId::new();
        let id = store.store_photo(owner, PNG).await.unwrap();
        assert!(matches!(
            store.get_photo(UserId::new(), id).await,
            Err(ServerError::BlobNotFound(_))
        ));

        store.delete_photo(owner, id).await.unwrap();
        assert!(store.get_photo(owner, id).await.is_err());
    }
}
