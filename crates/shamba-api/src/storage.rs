use std::path::{Path as FsPath, PathBuf};

use anyhow::{Result, bail};
use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use shamba_types::api::{Claims, UploadResponse};

use crate::auth::AppState;
use crate::error::ApiError;

/// 5 MB per uploaded image
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

pub const BUCKETS: &[&str] = &["product-images", "store-images", "avatars"];

/// Accepted content types and the extension stored objects get.
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

/// Bucketed object storage on local disk.
///
/// Objects live at `{dir}/{bucket}/{owner_id}/{upload_id}-{sha256}.{ext}`.
/// Every upload gets its own key, even for identical bytes, so deleting a
/// draft's image never touches an object a saved record points at.
pub struct Storage {
    dir: PathBuf,
    public_url: String,
}

impl Storage {
    pub async fn new(dir: PathBuf, public_url: &str) -> Result<Self> {
        for bucket in BUCKETS {
            fs::create_dir_all(dir.join(bucket)).await?;
        }
        info!("Object storage directory: {}", dir.display());
        Ok(Self {
            dir,
            public_url: public_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn dir(&self) -> &FsPath {
        &self.dir
    }

    /// Public URL an object is served from.
    pub fn url(&self, bucket: &str, key: &str) -> String {
        format!("{}/files/{}/{}", self.public_url, bucket, key)
    }

    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        if !BUCKETS.contains(&bucket) {
            bail!("unknown bucket {}", bucket);
        }
        if key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
            bail!("malformed key {}", key);
        }
        Ok(self.dir.join(bucket).join(key))
    }

    /// Write `data` under the owner's prefix and return its key.
    pub async fn put(&self, bucket: &str, owner_id: Uuid, ext: &str, data: &[u8]) -> Result<String> {
        let digest = hex::encode(Sha256::digest(data));
        let key = format!("{}/{}-{}.{}", owner_id, Uuid::new_v4().simple(), digest, ext);
        let path = self.object_path(bucket, &key)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data).await?;
        info!("Stored {}/{} ({} bytes)", bucket, key, data.len());
        Ok(key)
    }

    /// Remove an object. A missing object is not an error.
    pub async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let path = self.object_path(bucket, key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!("Deleted {}/{}", bucket, key);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Object {}/{} already gone", bucket, key);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next()?.trim();
    IMAGE_TYPES
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(essence))
        .map(|(_, ext)| *ext)
}

/// POST /storage/{bucket} with the raw image as body.
pub async fn upload(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    if !BUCKETS.contains(&bucket.as_str()) {
        return Err(ApiError::NotFound);
    }
    if body.is_empty() {
        return Err(ApiError::Validation("File is empty".into()));
    }
    if body.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::PayloadTooLarge);
    }
    let ext = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(extension_for)
        .ok_or(ApiError::UnsupportedMediaType)?;

    let key = state.storage.put(&bucket, claims.sub, ext, &body).await?;
    let url = state.storage.url(&bucket, &key);

    Ok((StatusCode::CREATED, Json(UploadResponse { bucket, key, url })))
}

/// DELETE /storage/{bucket}/{key}. Callers may only delete under their own prefix.
pub async fn delete_object(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    if !BUCKETS.contains(&bucket.as_str()) {
        return Err(ApiError::NotFound);
    }
    let owner_prefix = format!("{}/", claims.sub);
    if !key.starts_with(&owner_prefix) {
        return Err(ApiError::Forbidden);
    }
    state
        .storage
        .delete(&bucket, &key)
        .await
        .map_err(|e| {
            warn!("delete {}/{} refused: {}", bucket, key, e);
            ApiError::Validation("Invalid object key".into())
        })?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types_map_to_extensions() {
        assert_eq!(extension_for("image/png"), Some("png"));
        assert_eq!(extension_for("IMAGE/JPEG; charset=binary"), Some("jpg"));
        assert_eq!(extension_for("application/pdf"), None);
    }

    #[tokio::test]
    async fn identical_uploads_get_their_own_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf(), "http://localhost:3000/").await.unwrap();
        let owner = Uuid::new_v4();

        let a = storage.put("avatars", owner, "png", b"not really a png").await.unwrap();
        let b = storage.put("avatars", owner, "png", b"not really a png").await.unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with(&owner.to_string()));
        assert!(a.ends_with(&format!("{}.png", hex::encode(Sha256::digest(b"not really a png")))));
        assert_eq!(
            storage.url("avatars", &a),
            format!("http://localhost:3000/files/avatars/{}", a)
        );

        storage.delete("avatars", &a).await.unwrap();
        assert!(!dir.path().join("avatars").join(&a).exists());
        assert!(dir.path().join("avatars").join(&b).exists());
        // already gone
        storage.delete("avatars", &a).await.unwrap();
    }

    #[tokio::test]
    async fn traversal_keys_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf(), "http://x").await.unwrap();
        assert!(storage.delete("avatars", "u/../../etc/passwd").await.is_err());
        assert!(storage.delete("not-a-bucket", "u/a.png").await.is_err());
    }
}
