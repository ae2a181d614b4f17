//! Service wiring: repositories, blob storage, classifier, auth primitives.

use std::sync::Arc;

use anyhow::Context;
use chrono::Duration;

use factha_auth::{BcryptPasswordHasher, Hs256Jwt, PasswordHasher};
use factha_classifier::ModelSlot;
use factha_infra::config::StorageBackend;
use factha_infra::repository::{
    InMemoryRepositories, NewsRepository, PostgresRepositories, SavedNewsRepository,
    UserRepository,
};
use factha_infra::storage::{
    BlobStore, Folder, GcsBlobStore, GcsCredentials, InMemoryBlobStore, ObjectKey,
};
use factha_infra::{Settings, db};

use crate::app::errors::ApiError;
use crate::app::upload::UploadedFile;

pub struct AppServices {
    pub users: Arc<dyn UserRepository>,
    pub news: Arc<dyn NewsRepository>,
    pub saved: Arc<dyn SavedNewsRepository>,
    pub blobs: Arc<dyn BlobStore>,
    pub classifier: Arc<ModelSlot>,
    pub jwt: Arc<Hs256Jwt>,
    pub passwords: Arc<dyn PasswordHasher>,
}

/// Build services from settings (Postgres and GCS when configured, memory otherwise).
pub async fn build_services(settings: &Settings) -> anyhow::Result<AppServices> {
    let jwt_secret = settings.auth.jwt_secret.clone().unwrap_or_else(|| {
        tracing::warn!("auth.jwt_secret not set; using insecure dev default");
        "dev-secret".to_string()
    });
    let jwt = Arc::new(Hs256Jwt::new(
        jwt_secret.as_bytes(),
        Duration::seconds(settings.auth.token_ttl_secs),
    ));

    let (users, news, saved) = match db::connect(&settings.database)
        .await
        .context("failed to connect to postgres")?
    {
        Some(pool) => {
            db::ensure_schema(&pool)
                .await
                .context("failed to create database schema")?;
            split(Arc::new(PostgresRepositories::new(pool)))
        }
        None => {
            tracing::warn!("database.url not set; using in-memory repositories");
            split(Arc::new(InMemoryRepositories::new()))
        }
    };

    let storage = &settings.storage;
    let blobs: Arc<dyn BlobStore> = match storage.backend {
        StorageBackend::Gcs => {
            let credentials = GcsCredentials::resolve(
                storage.access_token.clone(),
                storage.credentials_file.as_deref(),
            )
            .context("failed to load storage credentials")?;
            Arc::new(GcsBlobStore::new(
                storage.bucket.clone(),
                &storage.public_base_url,
                credentials,
            ))
        }
        StorageBackend::Memory => Arc::new(InMemoryBlobStore::new(format!(
            "{}/{}",
            storage.public_base_url.trim_end_matches('/'),
            storage.bucket
        ))),
    };

    let classifier = Arc::new(ModelSlot::new(settings.classifier.model_path.clone()));
    let slot = classifier.clone();
    match tokio::task::spawn_blocking(move || slot.get()).await? {
        Ok(loaded) => tracing::info!(model = loaded.model_name(), "classifier ready"),
        // /predict answers 503 and retries the load on each call.
        Err(e) => tracing::warn!(error = %e, "classifier not loaded at startup"),
    }

    Ok(AppServices {
        users,
        news,
        saved,
        blobs,
        classifier,
        jwt,
        passwords: Arc::new(BcryptPasswordHasher::new(settings.auth.bcrypt_cost)),
    })
}

type Repositories = (
    Arc<dyn UserRepository>,
    Arc<dyn NewsRepository>,
    Arc<dyn SavedNewsRepository>,
);

fn split<R>(repos: Arc<R>) -> Repositories
where
    R: UserRepository + NewsRepository + SavedNewsRepository + 'static,
{
    (repos.clone(), repos.clone(), repos)
}

impl AppServices {
    /// Everything in memory; used by tests and local runs without infrastructure.
    pub fn in_memory(
        jwt_secret: &str,
        blobs: Arc<dyn BlobStore>,
        classifier: ModelSlot,
        bcrypt_cost: u32,
    ) -> Self {
        let (users, news, saved) = split(Arc::new(InMemoryRepositories::new()));
        Self {
            users,
            news,
            saved,
            blobs,
            classifier: Arc::new(classifier),
            jwt: Arc::new(Hs256Jwt::new(jwt_secret.as_bytes(), Duration::hours(1))),
            passwords: Arc::new(BcryptPasswordHasher::new(bcrypt_cost)),
        }
    }

    /// Upload an image and return its key and public URL.
    pub async fn store_image(
        &self,
        folder: Folder,
        file: UploadedFile,
    ) -> Result<(ObjectKey, String), ApiError> {
        let key = ObjectKey::new(folder, &file.file_name);
        self.blobs.put(&key, file.bytes, file.content_type).await?;
        let url = self.blobs.public_url(&key);
        Ok((key, url))
    }

    /// Delete the image a row points at, if any.
    ///
    /// The stored key is preferred; the URL is a fallback for rows without one.
    pub async fn delete_image(
        &self,
        file_name: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<(), ApiError> {
        let key = file_name
            .and_then(|f| ObjectKey::parse(f).ok())
            .or_else(|| image_url.and_then(|u| self.blobs.key_from_url(u)));
        if let Some(key) = key {
            self.blobs.delete(&key).await?;
        }
        Ok(())
    }

    /// Like [`AppServices::delete_image`], but a failure is only logged.
    pub async fn discard_image(&self, file_name: Option<&str>, image_url: Option<&str>) {
        if let Err(e) = self.delete_image(file_name, image_url).await {
            tracing::warn!(error = %e, file_name, "failed to delete replaced image");
        }
    }
}

/// Run CPU-bound work (bcrypt, inference) off the async workers.
pub async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::internal(format!("blocking task failed: {e}")))
}
