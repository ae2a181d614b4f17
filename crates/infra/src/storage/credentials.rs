//! OAuth access tokens for Cloud Storage.
//!
//! Three sources, in order of precedence: a static token from config, a
//! service-account key file (signed JWT-bearer grant), or the GCE metadata
//! server. Fetched tokens are cached until shortly before they expire.

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::StorageError;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const STORAGE_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_write";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
/// Google rejects assertions valid for longer than an hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh fetched tokens this long before they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub enum GcsCredentials {
    AccessToken(String),
    ServiceAccount(ServiceAccountKey),
    Metadata,
}

impl GcsCredentials {
    /// A static token wins over a key file; with neither, ask the metadata server.
    pub fn resolve(
        access_token: Option<String>,
        credentials_file: Option<&Path>,
    ) -> Result<Self, StorageError> {
        if let Some(token) = access_token {
            return Ok(Self::AccessToken(token));
        }
        match credentials_file {
            Some(path) => Ok(Self::ServiceAccount(ServiceAccountKey::from_file(path)?)),
            None => Ok(Self::Metadata),
        }
    }
}

/// The parts of a service-account JSON key needed to mint tokens.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    key_type: String,
    client_email: String,
    private_key: String,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self, StorageError> {
        let key: Self = serde_json::from_str(raw)
            .map_err(|e| StorageError::Auth(format!("malformed service account key: {e}")))?;
        if key.key_type != "service_account" {
            return Err(StorageError::Auth(format!(
                "expected a service_account key, got: {}",
                key.key_type
            )));
        }
        Ok(key)
    }

    pub fn from_file(path: &Path) -> Result<Self, StorageError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StorageError::Auth(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&raw)
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    fn claims(&self, now: i64) -> AssertionClaims {
        AssertionClaims {
            iss: self.client_email.clone(),
            scope: STORAGE_SCOPE.to_string(),
            aud: self.token_uri.clone(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        }
    }

    /// RS256-signed assertion for the JWT-bearer grant.
    fn assertion(&self, now: i64) -> Result<String, StorageError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| StorageError::Auth(format!("invalid service account private key: {e}")))?;
        jsonwebtoken::encode(&header, &self.claims(now), &key)
            .map_err(|e| StorageError::Auth(format!("failed to sign token assertion: {e}")))
    }
}

impl core::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug)]
struct CachedToken {
    token: String,
    refresh_at: Instant,
}

#[derive(Debug)]
pub(super) struct TokenProvider {
    credentials: GcsCredentials,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub(super) fn new(credentials: GcsCredentials) -> Self {
        Self {
            credentials,
            cached: Mutex::new(None),
        }
    }

    pub(super) async fn token(&self, client: &reqwest::Client) -> Result<String, StorageError> {
        if let GcsCredentials::AccessToken(token) = &self.credentials {
            return Ok(token.clone());
        }

        let mut cached = self.cached.lock().await;
        if let Some(c) = cached.as_ref().filter(|c| Instant::now() < c.refresh_at) {
            return Ok(c.token.clone());
        }

        let fresh = self.fetch(client).await?;
        let lifetime = Duration::from_secs(fresh.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        tracing::debug!(expires_in = fresh.expires_in, "fetched storage access token");
        *cached = Some(CachedToken {
            token: fresh.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(fresh.access_token)
    }

    async fn fetch(&self, client: &reqwest::Client) -> Result<AccessTokenResponse, StorageError> {
        let request = match &self.credentials {
            GcsCredentials::AccessToken(_) | GcsCredentials::Metadata => client
                .get(METADATA_TOKEN_URL)
                .header("Metadata-Flavor", "Google"),
            GcsCredentials::ServiceAccount(key) => {
                let assertion = key.assertion(Utc::now().timestamp())?;
                client.post(&key.token_uri).form(&[
                    ("grant_type", JWT_BEARER_GRANT),
                    ("assertion", assertion.as_str()),
                ])
            }
        };

        let resp = request
            .send()
            .await
            .map_err(|e| StorageError::Auth(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(StorageError::Auth(format!("token endpoint returned {status} {body}")));
        }
        resp.json()
            .await
            .map_err(|e| StorageError::Auth(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation};

    const KEY_JSON: &str = include_str!("../../testdata/service-account.json");
    const PUBLIC_PEM: &str = include_str!("../../testdata/service-account.pub.pem");

    fn key() -> ServiceAccountKey {
        ServiceAccountKey::from_json(KEY_JSON).unwrap()
    }

    #[test]
    fn key_file_fields_are_read() {
        let key = key();
        assert_eq!(key.client_email(), "uploader@factha-test.iam.gserviceaccount.com");
        assert_eq!(key.token_uri, "https://oauth2.googleapis.com/token");
        assert_eq!(key.private_key_id.as_deref(), Some("0123456789abcdef"));
    }

    #[test]
    fn non_service_account_keys_are_rejected() {
        let raw = r#"{"type":"authorized_user","client_email":"a@b.c","private_key":"x"}"#;
        assert!(matches!(ServiceAccountKey::from_json(raw), Err(StorageError::Auth(_))));
        assert!(matches!(ServiceAccountKey::from_json("{"), Err(StorageError::Auth(_))));
    }

    #[test]
    fn assertion_claims_target_the_token_endpoint() {
        let claims = key().claims(1_700_000_000);
        assert_eq!(
            claims,
            AssertionClaims {
                iss: "uploader@factha-test.iam.gserviceaccount.com".to_string(),
                scope: "https://www.googleapis.com/auth/devstorage.read_write".to_string(),
                aud: "https://oauth2.googleapis.com/token".to_string(),
                iat: 1_700_000_000,
                exp: 1_700_003_600,
            }
        );
    }

    #[test]
    fn assertion_is_signed_with_the_account_key() {
        let key = key();
        let now = Utc::now().timestamp();
        let assertion = key.assertion(now).unwrap();

        let header = jsonwebtoken::decode_header(&assertion).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some("0123456789abcdef"));

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&["https://oauth2.googleapis.com/token"]);
        validation.set_issuer(&["uploader@factha-test.iam.gserviceaccount.com"]);
        let decoded = jsonwebtoken::decode::<AssertionClaims>(
            &assertion,
            &DecodingKey::from_rsa_pem(PUBLIC_PEM.as_bytes()).unwrap(),
            &validation,
        )
        .unwrap();
        assert_eq!(decoded.claims, key.claims(now));
    }

    #[test]
    fn unusable_private_key_is_an_auth_error() {
        let raw = r#"{"type":"service_account","client_email":"a@b.c","private_key":"not a pem"}"#;
        let key = ServiceAccountKey::from_json(raw).unwrap();
        assert!(matches!(key.assertion(0), Err(StorageError::Auth(_))));
    }

    #[test]
    fn debug_output_omits_the_private_key() {
        let printed = format!("{:?}", key());
        assert!(printed.contains("uploader@factha-test"));
        assert!(!printed.contains("PRIVATE KEY"));
    }

    #[test]
    fn static_token_takes_precedence_over_a_key_file() {
        let missing = Path::new("/nonexistent/key.json");
        let creds = GcsCredentials::resolve(Some("tok".to_string()), Some(missing)).unwrap();
        assert!(matches!(creds, GcsCredentials::AccessToken(t) if t == "tok"));

        assert!(matches!(GcsCredentials::resolve(None, None), Ok(GcsCredentials::Metadata)));
        assert!(matches!(
            GcsCredentials::resolve(None, Some(missing)),
            Err(StorageError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn static_token_is_returned_without_a_request() {
        let provider = TokenProvider::new(GcsCredentials::AccessToken("tok".to_string()));
        assert_eq!(provider.token(&reqwest::Client::new()).await.unwrap(), "tok");
    }
}
