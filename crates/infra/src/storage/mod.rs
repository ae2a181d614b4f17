//! Object storage for uploaded images.
//!
//! Rows keep the object key (`file_name`) and the public URL (`image_url`);
//! the bytes live in a [`BlobStore`].

use core::fmt;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub mod credentials;
pub mod gcs;
pub mod in_memory;

pub use credentials::{GcsCredentials, ServiceAccountKey};
pub use gcs::GcsBlobStore;
pub use in_memory::InMemoryBlobStore;

const MAX_BASENAME_CHARS: usize = 100;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("unsupported content type: {0} (expected image/jpeg, image/png or image/webp)")]
    UnsupportedContentType(String),

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("object storage authentication failed: {0}")]
    Auth(String),

    #[error("object storage error: {0}")]
    Backend(String),
}

/// Top-level folder an object is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Folder {
    Thumbnails,
    ProfilePictures,
}

impl Folder {
    pub const ALL: [Folder; 2] = [Folder::Thumbnails, Folder::ProfilePictures];

    pub fn as_str(&self) -> &'static str {
        match self {
            Folder::Thumbnails => "thumbnail-news",
            Folder::ProfilePictures => "profile-picture",
        }
    }
}

/// Key of a stored object: `{folder}/{12 hex}-{sanitized basename}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Fresh key for an upload named `file_name` by the client.
    pub fn new(folder: Folder, file_name: &str) -> Self {
        let simple = Uuid::new_v4().simple().to_string();
        // 48 of the 122 random bits of a v4 uuid
        let prefix = &simple[..12];
        Self(format!("{}/{prefix}-{}", folder.as_str(), sanitize_basename(file_name)))
    }

    /// Accept a key previously produced by [`ObjectKey::new`] (e.g. a stored `file_name`).
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        let (folder, name) = raw
            .split_once('/')
            .ok_or_else(|| StorageError::InvalidKey(raw.to_string()))?;
        let known_folder = Folder::ALL.iter().any(|f| f.as_str() == folder);
        let safe_name = !name.is_empty() && name.chars().all(is_safe_char);
        if !known_folder || !safe_name {
            return Err(StorageError::InvalidKey(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Recover the key from a public URL built on `base` (`{base}/{key}`).
    pub fn from_public_url(url: &str, base: &str) -> Option<Self> {
        let rest = url.strip_prefix(base.trim_end_matches('/'))?;
        Self::parse(rest.strip_prefix('/')?).ok()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')
}

fn sanitize_basename(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    let cleaned: String = base
        .chars()
        .map(|c| if is_safe_char(c) { c } else { '_' })
        .take(MAX_BASENAME_CHARS)
        .collect();
    if cleaned.trim_matches(['.', '_']).is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}

/// Resolve the content type of an image upload.
///
/// The declared multipart content type wins; `application/octet-stream` or a
/// missing one falls back to the file extension.
pub fn image_content_type(
    declared: Option<&str>,
    file_name: &str,
) -> Result<&'static str, StorageError> {
    let declared = declared
        .map(|d| d.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
        .filter(|d| !d.is_empty() && d != "application/octet-stream");

    let resolved = match declared {
        Some(d) => d,
        None => {
            let ext = file_name
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_ascii_lowercase())
                .unwrap_or_default();
            match ext.as_str() {
                "jpg" | "jpeg" => "image/jpeg".to_string(),
                "png" => "image/png".to_string(),
                "webp" => "image/webp".to_string(),
                other => format!("application/x-{other}"),
            }
        }
    };

    match resolved.as_str() {
        "image/jpeg" | "image/jpg" => Ok("image/jpeg"),
        "image/png" => Ok("image/png"),
        "image/webp" => Ok("image/webp"),
        _ => Err(StorageError::UnsupportedContentType(resolved)),
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &ObjectKey, bytes: Vec<u8>, content_type: &str)
    -> Result<(), StorageError>;

    /// Deleting an object that does not exist succeeds.
    async fn delete(&self, key: &ObjectKey) -> Result<(), StorageError>;

    /// Public URL prefix, without trailing slash.
    fn base_url(&self) -> &str;

    fn public_url(&self, key: &ObjectKey) -> String {
        format!("{}/{}", self.base_url(), key)
    }

    fn key_from_url(&self, url: &str) -> Option<ObjectKey> {
        ObjectKey::from_public_url(url, self.base_url())
    }
}
