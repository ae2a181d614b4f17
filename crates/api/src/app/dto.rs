use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use factha_classifier::Verdict;
use factha_core::{News, PredictionId, SavedNews, User};

// -------------------------
// Envelope
// -------------------------

#[derive(Debug, Serialize)]
struct Envelope<'a, T> {
    status: &'static str,
    message: &'a str,
    data: T,
}

pub fn success<T: Serialize>(status: StatusCode, message: &str, data: T) -> Response {
    (
        status,
        Json(Envelope {
            status: "success",
            message,
            data,
        }),
    )
        .into_response()
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveNewsRequest {
    pub news_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub keyword: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredUser {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    pub user_id: String,
    pub name: String,
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoAmI {
    pub user_id: String,
    pub email: String,
    pub name: String,
}

/// Public view of a user: the password hash stays on the server.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id.to_string(),
            name: user.name,
            email: user.email,
            bio: user.bio,
            image_url: user.image_url,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsView {
    pub news_id: String,
    pub user_id: String,
    pub title: String,
    pub tags: Vec<String>,
    pub body: String,
    pub file_name: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<News> for NewsView {
    fn from(news: News) -> Self {
        Self {
            news_id: news.id.to_string(),
            user_id: news.author_id.to_string(),
            title: news.title,
            tags: news.tags,
            body: news.body,
            file_name: news.file_name,
            image_url: news.image_url,
            created_at: news.created_at,
            updated_at: news.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedNewsView {
    pub saved_id: String,
    pub user_id: String,
    pub news_id: String,
    pub created_at: DateTime<Utc>,
    pub news: NewsView,
}

impl SavedNewsView {
    pub fn new(saved: SavedNews, news: News) -> Self {
        Self {
            saved_id: saved.id.to_string(),
            user_id: saved.user_id.to_string(),
            news_id: saved.news_id.to_string(),
            created_at: saved.created_at,
            news: news.into(),
        }
    }
}

/// Outcome of one `/predict` call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionView {
    pub id: String,
    /// 1 = hoax, 0 = valid.
    pub result: u8,
    pub label: &'static str,
    /// Confidence of the chosen label, in percent.
    pub score: f64,
    pub hoax_score: f64,
    pub valid_score: f64,
    pub description: &'static str,
    pub created_at: DateTime<Utc>,
}

impl PredictionView {
    pub fn new(verdict: &Verdict, created_at: DateTime<Utc>) -> Self {
        Self {
            id: PredictionId::new().to_string(),
            result: verdict.label.result_code(),
            label: verdict.label.as_str(),
            score: verdict.confidence(),
            hoax_score: verdict.hoax_score,
            valid_score: verdict.valid_score,
            description: verdict.description(),
            created_at,
        }
    }
}
