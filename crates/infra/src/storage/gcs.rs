//! Google Cloud Storage over the JSON API.

use async_trait::async_trait;

use super::credentials::{GcsCredentials, TokenProvider};
use super::{BlobStore, ObjectKey, StorageError};

const DEFAULT_API_BASE: &str = "https://storage.googleapis.com";

pub struct GcsBlobStore {
    client: reqwest::Client,
    api_base: String,
    bucket: String,
    base_url: String,
    tokens: TokenProvider,
}

impl GcsBlobStore {
    pub fn new(bucket: String, public_base_url: &str, credentials: GcsCredentials) -> Self {
        let base_url = format!("{}/{}", public_base_url.trim_end_matches('/'), bucket);
        Self {
            client: reqwest::Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            bucket,
            base_url,
            tokens: TokenProvider::new(credentials),
        }
    }

    /// Point the JSON API calls somewhere else (emulators).
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    fn upload_url(&self) -> String {
        format!("{}/upload/storage/v1/b/{}/o", self.api_base, self.bucket)
    }

    fn object_url(&self, key: &ObjectKey) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}",
            self.api_base,
            self.bucket,
            encode_object_name(key.as_str())
        )
    }

    async fn token(&self) -> Result<String, StorageError> {
        self.tokens.token(&self.client).await
    }
}

impl core::fmt::Debug for GcsBlobStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GcsBlobStore")
            .field("api_base", &self.api_base)
            .field("bucket", &self.bucket)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn put(
        &self,
        key: &ObjectKey,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let token = self.token().await?;
        let size = bytes.len();
        let resp = self
            .client
            .post(self.upload_url())
            .query(&[("uploadType", "media"), ("name", key.as_str())])
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(StorageError::Backend(format!("upload of {key} failed: {status} {body}")));
        }

        tracing::info!(key = %key, bytes = size, "uploaded object");
        Ok(())
    }

    async fn delete(&self, key: &ObjectKey) -> Result<(), StorageError> {
        let token = self.token().await?;
        let resp = self
            .client
            .delete(self.object_url(key))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::warn!(key = %key, "object to delete was already gone");
            return Ok(());
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(StorageError::Backend(format!("delete of {key} failed: {status} {body}")));
        }

        tracing::info!(key = %key, "deleted object");
        Ok(())
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Percent-encode an object name for use as a single path segment.
fn encode_object_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for b in name.bytes() {
        if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}
