use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use factha_auth::authorize_owner;
use factha_core::{NewsId, SavedNews, SavedNewsId, UserId};
use factha_infra::repository::RepositoryError;

use crate::app::dto::{self, SaveNewsRequest, SavedNewsView};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    // GET takes a user id, DELETE a bookmark id; one route since the
    // router cannot hold two parameter names at the same position.
    Router::new()
        .route("/", post(save_news))
        .route("/:id", get(list_saved_news).delete(delete_saved_news))
}

pub async fn save_news(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    payload: Result<Json<SaveNewsRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload?;
    let news_id: NewsId = body.news_id.parse()?;

    let news = services
        .news
        .get(news_id)
        .await?
        .ok_or_else(|| ApiError::not_found("news not found"))?;

    let saved = SavedNews::new(principal.user_id(), news.id, Utc::now());
    services.saved.insert(&saved).await.map_err(|e| match e {
        RepositoryError::Conflict(_) => {
            ApiError::Conflict("news already saved".to_string())
        }
        other => other.into(),
    })?;

    tracing::info!(saved_id = %saved.id, news_id = %news.id, "news saved");
    Ok(dto::success(
        StatusCode::CREATED,
        "news saved",
        SavedNewsView::new(saved, news),
    ))
}

pub async fn list_saved_news(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(user_id): Path<String>,
) -> Result<Response, ApiError> {
    let user_id: UserId = user_id.parse()?;
    authorize_owner(principal.user_id(), user_id, "saved news list")?;

    let mut views = Vec::new();
    for saved in services.saved.list_for_user(user_id).await? {
        // a bookmark can outlive its article between the two reads
        if let Some(news) = services.news.get(saved.news_id).await? {
            views.push(SavedNewsView::new(saved, news));
        }
    }
    Ok(dto::success(StatusCode::OK, "saved news", views))
}

pub async fn delete_saved_news(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: SavedNewsId = id.parse()?;
    let saved = services
        .saved
        .get(id)
        .await?
        .filter(|s| s.is_owned_by(principal.user_id()))
        .ok_or_else(|| ApiError::not_found("saved news not found"))?;

    services.saved.delete(saved.id).await?;

    tracing::info!(saved_id = %saved.id, "saved news removed");
    Ok(dto::success(
        StatusCode::OK,
        "saved news removed",
        json!({ "savedId": saved.id.to_string() }),
    ))
}
