use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use factha_api::app::{build_router, services::AppServices};
use factha_auth::JwtClaims;
use factha_classifier::{Classifier, ModelArtifact, ModelSlot};
use factha_core::UserId;
use factha_infra::storage::{InMemoryBlobStore, ObjectKey};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};

const JWT_SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    blobs: Arc<InMemoryBlobStore>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(ModelSlot::preloaded(test_classifier())).await
    }

    async fn spawn_with(classifier: ModelSlot) -> Self {
        Self::spawn_limited(classifier, 1024 * 1024).await
    }

    async fn spawn_limited(classifier: ModelSlot, max_body_bytes: usize) -> Self {
        // Same router as prod over in-memory services, bound to an ephemeral port.
        let blobs = Arc::new(InMemoryBlobStore::new("http://blobs.test/factha-bucket"));
        let services = AppServices::in_memory(JWT_SECRET, blobs.clone(), classifier, 4);
        let app = build_router(Arc::new(services), max_body_bytes);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            blobs,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Register and log in; returns (user id, token).
    async fn signup(&self, name: &str, email: &str) -> (String, String) {
        let res = self
            .client
            .post(self.url("/register"))
            .json(&json!({ "name": name, "email": email, "password": "rahasia123" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = self
            .client
            .post(self.url("/login"))
            .json(&json!({ "email": email, "password": "rahasia123" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        (
            body["data"]["userId"].as_str().unwrap().to_string(),
            body["data"]["token"].as_str().unwrap().to_string(),
        )
    }

    async fn create_news(&self, token: &str, title: &str, body: &str, thumbnail: bool) -> Value {
        let mut form = Form::new()
            .text("title", title.to_string())
            .text("tags", "kesehatan, Vaksin")
            .text("body", body.to_string());
        if thumbnail {
            form = form.part("thumbnail", png("thumb.png"));
        }
        let res = self
            .client
            .post(self.url("/news"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        body["data"].clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn test_classifier() -> Classifier {
    let vocabulary = [("vaksin", 2), ("chip", 3), ("kemenkes", 4), ("resmi", 5)]
        .into_iter()
        .map(|(w, id)| (w.to_string(), id))
        .collect();
    Classifier::from_artifact(ModelArtifact {
        name: "test-bow".to_string(),
        sequence_length: 16,
        vocabulary,
        oov_buckets: 4,
        weights: vec![0.0, 0.0, 0.0, 3.0, -3.0, -2.0, 0.0, 0.0, 0.0, 0.0],
        bias: 0.0,
    })
    .expect("valid test artifact")
}

fn png(name: &str) -> Part {
    Part::bytes(vec![0x89, b'P', b'N', b'G', 1, 2, 3])
        .file_name(name.to_string())
        .mime_str("image/png")
        .unwrap()
}

fn mint_jwt(secret: &str, sub: UserId, issued_at_offset: ChronoDuration) -> String {
    let issued_at = Utc::now() + issued_at_offset;
    let claims = JwtClaims {
        sub,
        email: "someone@example.com".to_string(),
        name: "Someone".to_string(),
        issued_at,
        expires_at: issued_at + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    for path in ["/whoami", "/users", "/news"] {
        let res = srv.client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{path}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["status"], "fail");
        assert_eq!(body["error"], "unauthorized");
    }

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn forged_and_expired_tokens_are_rejected() {
    let srv = TestServer::spawn().await;

    let forged = mint_jwt("other-secret", UserId::new(), ChronoDuration::zero());
    let res = srv
        .client
        .get(srv.url("/whoami"))
        .bearer_auth(forged)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let expired = mint_jwt(JWT_SECRET, UserId::new(), -ChronoDuration::hours(1));
    let res = srv
        .client
        .get(srv.url("/whoami"))
        .bearer_auth(expired)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let sub = UserId::new();
    let valid = mint_jwt(JWT_SECRET, sub, ChronoDuration::zero());
    let res = srv
        .client
        .get(srv.url("/whoami"))
        .bearer_auth(valid)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["userId"].as_str().unwrap(), sub.to_string());
}

#[tokio::test]
async fn register_and_login_rules() {
    let srv = TestServer::spawn().await;
    let (user_id, token) = srv.signup("Budi", "Budi@Example.com").await;

    let res = srv
        .client
        .get(srv.url("/whoami"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["userId"], user_id.as_str());
    assert_eq!(body["data"]["email"], "budi@example.com");

    // same email, different case
    let res = srv
        .client
        .post(srv.url("/register"))
        .json(&json!({ "name": "Other", "email": "BUDI@example.com", "password": "rahasia123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = srv
        .client
        .post(srv.url("/register"))
        .json(&json!({ "name": "X", "email": "not-an-email", "password": "rahasia123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .post(srv.url("/register"))
        .json(&json!({ "name": "X", "email": "x@example.com", "password": "short" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .post(srv.url("/login"))
        .json(&json!({ "email": "nobody@example.com", "password": "rahasia123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv
        .client
        .post(srv.url("/login"))
        .json(&json!({ "email": "budi@example.com", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .post(srv.url("/login"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "fail");
}

#[tokio::test]
async fn user_listing_never_exposes_password_hashes() {
    let srv = TestServer::spawn().await;
    let (user_id, token) = srv.signup("Budi", "budi@example.com").await;
    srv.signup("Sari", "sari@example.com").await;

    let res = srv
        .client
        .get(srv.url("/users"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let text = res.text().await.unwrap();
    assert!(!text.contains("password"), "{text}");
    assert!(!text.contains("$2"), "{text}");
    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let res = srv
        .client
        .get(srv.url(&format!("/users/{user_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv
        .client
        .get(srv.url(&format!("/users/{}", UserId::new())))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv
        .client
        .get(srv.url("/users/not-a-uuid"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_update_is_self_only_and_replaces_the_picture() {
    let srv = TestServer::spawn().await;
    let (budi_id, budi) = srv.signup("Budi", "budi@example.com").await;
    let (_, sari) = srv.signup("Sari", "sari@example.com").await;

    let form = || {
        Form::new()
            .text("name", "Budi Santoso")
            .text("email", "budi@example.com")
            .text("oldPassword", "rahasia123")
            .text("body", "Jurnalis")
    };

    let res = srv
        .client
        .put(srv.url(&format!("/users/{budi_id}")))
        .bearer_auth(&sari)
        .multipart(form())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let wrong = Form::new()
        .text("name", "Budi")
        .text("email", "budi@example.com")
        .text("oldPassword", "not-my-password");
    let res = srv
        .client
        .put(srv.url(&format!("/users/{budi_id}")))
        .bearer_auth(&budi)
        .multipart(wrong)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let taken = Form::new()
        .text("name", "Budi")
        .text("email", "sari@example.com")
        .text("oldPassword", "rahasia123");
    let res = srv
        .client
        .put(srv.url(&format!("/users/{budi_id}")))
        .bearer_auth(&budi)
        .multipart(taken)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = srv
        .client
        .put(srv.url(&format!("/users/{budi_id}")))
        .bearer_auth(&budi)
        .multipart(form().part("image", png("me.png")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["name"], "Budi Santoso");
    assert_eq!(body["data"]["bio"], "Jurnalis");
    let first_url = body["data"]["imageUrl"].as_str().unwrap().to_string();
    assert!(first_url.starts_with("http://blobs.test/factha-bucket/profile-picture/"));
    assert_eq!(srv.blobs.len(), 1);

    let res = srv
        .client
        .put(srv.url(&format!("/users/{budi_id}")))
        .bearer_auth(&budi)
        .multipart(
            form()
                .text("newPassword", "baru12345")
                .part("image", png("me2.png")),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let second_url = body["data"]["imageUrl"].as_str().unwrap();
    assert_ne!(second_url, first_url);
    assert_eq!(srv.blobs.len(), 1, "old picture is deleted");

    let res = srv
        .client
        .post(srv.url("/login"))
        .json(&json!({ "email": "budi@example.com", "password": "baru12345" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn news_lifecycle_with_thumbnails() {
    let srv = TestServer::spawn().await;
    let (budi_id, budi) = srv.signup("Budi", "budi@example.com").await;
    let (_, sari) = srv.signup("Sari", "sari@example.com").await;

    let first = srv.create_news(&budi, "Vaksin aman", "Kemenkes menjelaskan", true).await;
    let second = srv.create_news(&budi, "Banjir", "Air naik di kota", false).await;
    assert_eq!(first["userId"], budi_id.as_str());
    assert_eq!(first["tags"], json!(["kesehatan", "vaksin"]));
    assert!(second["imageUrl"].is_null());
    assert_eq!(srv.blobs.len(), 1);

    let news_id = first["newsId"].as_str().unwrap().to_string();
    let thumb_key = ObjectKey::parse(first["fileName"].as_str().unwrap()).unwrap();
    assert!(thumb_key.as_str().starts_with("thumbnail-news/"));
    assert!(srv.blobs.get(&thumb_key).is_some());

    // newest first
    let res = srv
        .client
        .get(srv.url("/news"))
        .bearer_auth(&sari)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Banjir", "Vaksin aman"]);

    let res = srv
        .client
        .get(srv.url("/news/search?keyword=VAKSIN"))
        .bearer_auth(&sari)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let res = srv
        .client
        .get(srv.url("/news/search?keyword=%20%20"))
        .bearer_auth(&sari)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // someone else's article looks missing
    let edit = || {
        Form::new()
            .text("title", "Vaksin aman (revisi)")
            .text("tags", "kesehatan")
            .text("body", "Kemenkes menjelaskan lebih lanjut")
    };
    let res = srv
        .client
        .put(srv.url(&format!("/news/{news_id}")))
        .bearer_auth(&sari)
        .multipart(edit())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv
        .client
        .put(srv.url(&format!("/news/{news_id}")))
        .bearer_auth(&budi)
        .multipart(edit().part("thumbnail", png("new.png")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["title"], "Vaksin aman (revisi)");
    let new_key = ObjectKey::parse(body["data"]["fileName"].as_str().unwrap()).unwrap();
    assert_ne!(new_key, thumb_key);
    assert!(srv.blobs.get(&thumb_key).is_none(), "old thumbnail is deleted");
    assert_eq!(srv.blobs.len(), 1);

    let res = srv
        .client
        .delete(srv.url(&format!("/news/{news_id}")))
        .bearer_auth(&sari)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv
        .client
        .delete(srv.url(&format!("/news/{news_id}")))
        .bearer_auth(&budi)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(srv.blobs.is_empty());

    let res = srv
        .client
        .get(srv.url(&format!("/news/{news_id}")))
        .bearer_auth(&budi)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn news_input_is_validated() {
    let srv = TestServer::spawn().await;
    let (_, token) = srv.signup("Budi", "budi@example.com").await;

    let res = srv
        .client
        .post(srv.url("/news"))
        .bearer_auth(&token)
        .multipart(Form::new().text("title", "Tanpa isi").text("tags", ""))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let gif = Part::bytes(vec![b'G', b'I', b'F'])
        .file_name("a.gif")
        .mime_str("image/gif")
        .unwrap();
    let res = srv
        .client
        .post(srv.url("/news"))
        .bearer_auth(&token)
        .multipart(
            Form::new()
                .text("title", "Judul")
                .text("body", "Isi")
                .part("thumbnail", gif),
        )
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(srv.blobs.is_empty());
}

#[tokio::test]
async fn oversized_bodies_are_rejected_with_the_error_envelope() {
    let srv = TestServer::spawn_limited(ModelSlot::preloaded(test_classifier()), 1024).await;

    let res = srv
        .client
        .post(srv.url("/register"))
        .json(&json!({
            "name": "a".repeat(2048),
            "email": "besar@example.com",
            "password": "rahasia123",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "fail");
    assert_eq!(body["error"], "payload_too_large");

    // Small requests still go through under the same limit.
    let res = srv
        .client
        .post(srv.url("/login"))
        .json(&json!({ "email": "besar@example.com", "password": "rahasia123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn saved_news_belongs_to_its_owner() {
    let srv = TestServer::spawn().await;
    let (budi_id, budi) = srv.signup("Budi", "budi@example.com").await;
    let (sari_id, sari) = srv.signup("Sari", "sari@example.com").await;

    let article = srv.create_news(&budi, "Vaksin aman", "Kemenkes menjelaskan", false).await;
    let news_id = article["newsId"].as_str().unwrap().to_string();

    // anyone can save any article, not only its author
    let res = srv
        .client
        .post(srv.url("/savedNews"))
        .bearer_auth(&sari)
        .json(&json!({ "newsId": news_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["userId"], sari_id.as_str());
    let saved_id = body["data"]["savedId"].as_str().unwrap().to_string();

    let res = srv
        .client
        .post(srv.url("/savedNews"))
        .bearer_auth(&sari)
        .json(&json!({ "newsId": news_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = srv
        .client
        .post(srv.url("/savedNews"))
        .bearer_auth(&sari)
        .json(&json!({ "newsId": factha_core::NewsId::new().to_string() }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv
        .client
        .get(srv.url(&format!("/savedNews/{sari_id}")))
        .bearer_auth(&sari)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["news"]["title"], "Vaksin aman");

    let res = srv
        .client
        .get(srv.url(&format!("/savedNews/{sari_id}")))
        .bearer_auth(&budi)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .client
        .delete(srv.url(&format!("/savedNews/{saved_id}")))
        .bearer_auth(&budi)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = srv
        .client
        .delete(srv.url(&format!("/savedNews/{saved_id}")))
        .bearer_auth(&sari)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // deleting the article drops bookmarks pointing at it
    srv.client
        .post(srv.url("/savedNews"))
        .bearer_auth(&budi)
        .json(&json!({ "newsId": news_id }))
        .send()
        .await
        .unwrap();
    srv.client
        .delete(srv.url(&format!("/news/{news_id}")))
        .bearer_auth(&budi)
        .send()
        .await
        .unwrap();
    let res = srv
        .client
        .get(srv.url(&format!("/savedNews/{budi_id}")))
        .bearer_auth(&budi)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn predict_labels_text() {
    let srv = TestServer::spawn().await;
    let (_, token) = srv.signup("Budi", "budi@example.com").await;

    let res = srv
        .client
        .post(srv.url("/predict"))
        .bearer_auth(&token)
        .json(&json!({ "text": "Vaksin mengandung CHIP!" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    let data = &body["data"];
    assert_eq!(data["label"], "hoax");
    assert_eq!(data["result"], 1);
    assert!(data["score"].as_f64().unwrap() > 50.0);
    let total = data["hoaxScore"].as_f64().unwrap() + data["validScore"].as_f64().unwrap();
    assert!((total - 1.0).abs() < 1e-9);
    assert!(data["id"].as_str().is_some());

    let res = srv
        .client
        .post(srv.url("/predict"))
        .bearer_auth(&token)
        .json(&json!({ "text": "Kemenkes: vaksin resmi" }))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["label"], "valid");
    assert_eq!(body["data"]["result"], 0);

    for text in ["", "   ", "?!..."] {
        let res = srv
            .client
            .post(srv.url("/predict"))
            .bearer_auth(&token)
            .json(&json!({ "text": text }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{text:?}");
    }
}

#[tokio::test]
async fn predict_without_a_model_is_unavailable() {
    let srv = TestServer::spawn_with(ModelSlot::new(None)).await;
    let (_, token) = srv.signup("Budi", "budi@example.com").await;

    let res = srv
        .client
        .post(srv.url("/predict"))
        .bearer_auth(&token)
        .json(&json!({ "text": "apa saja" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "model_unavailable");
}
