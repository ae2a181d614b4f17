use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Multipart, Path, Query},
    http::StatusCode,
    response::Response,
    routing::get,
    Router,
};
use chrono::Utc;
use serde_json::json;

use factha_core::{News, NewsDraft, NewsId};
use factha_infra::storage::Folder;

use crate::app::dto::{self, NewsView, SearchParams};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::app::upload::FormData;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_news).post(create_news))
        .route("/search", get(search_news))
        .route("/:id", get(get_news).put(update_news).delete(delete_news))
}

fn draft_from_form(form: &FormData) -> Result<NewsDraft, ApiError> {
    Ok(NewsDraft::new(
        form.required("title")?,
        form.text("tags").unwrap_or_default(),
        form.required("body")?,
    )?)
}

/// Load an article the principal wrote; anyone else's is reported as missing.
async fn authored_news(
    services: &AppServices,
    principal: &PrincipalContext,
    id: &str,
) -> Result<News, ApiError> {
    let id: NewsId = id.parse()?;
    services
        .news
        .get(id)
        .await?
        .filter(|n| n.is_authored_by(principal.user_id()))
        .ok_or_else(|| ApiError::not_found("news not found"))
}

/// Multipart: `title`, `tags` (comma-separated), `body`, optional `thumbnail`.
pub async fn create_news(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut form = FormData::read(multipart, "thumbnail").await?;
    let draft = draft_from_form(&form)?;
    let mut news = News::publish(principal.user_id(), draft, Utc::now());

    if let Some(file) = form.take_file() {
        let (key, url) = services.store_image(Folder::Thumbnails, file).await?;
        news.file_name = Some(key.to_string());
        news.image_url = Some(url);
    }

    if let Err(e) = services.news.insert(&news).await {
        services
            .discard_image(news.file_name.as_deref(), news.image_url.as_deref())
            .await;
        return Err(e.into());
    }

    tracing::info!(news_id = %news.id, author = %news.author_id, "news created");
    Ok(dto::success(StatusCode::CREATED, "news created", NewsView::from(news)))
}

pub async fn list_news(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Response, ApiError> {
    let news: Vec<NewsView> = services
        .news
        .list()
        .await?
        .into_iter()
        .map(NewsView::from)
        .collect();
    Ok(dto::success(StatusCode::OK, "news", news))
}

pub async fn search_news(
    Extension(services): Extension<Arc<AppServices>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params?;
    let keyword = params.keyword.as_deref().map(str::trim).unwrap_or_default();
    if keyword.is_empty() {
        return Err(ApiError::validation("keyword must not be empty"));
    }

    let news: Vec<NewsView> = services
        .news
        .search(keyword)
        .await?
        .into_iter()
        .map(NewsView::from)
        .collect();
    Ok(dto::success(StatusCode::OK, "search results", news))
}

pub async fn get_news(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: NewsId = id.parse()?;
    let news = services
        .news
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("news not found"))?;
    Ok(dto::success(StatusCode::OK, "news", NewsView::from(news)))
}

/// Multipart, same fields as create; a new `thumbnail` replaces the old one.
pub async fn update_news(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut news = authored_news(&services, &principal, &id).await?;

    let mut form = FormData::read(multipart, "thumbnail").await?;
    let draft = draft_from_form(&form)?;
    news.revise(draft, Utc::now());

    let previous_image = (news.file_name.clone(), news.image_url.clone());
    let uploaded = match form.take_file() {
        Some(file) => {
            let (key, url) = services.store_image(Folder::Thumbnails, file).await?;
            news.file_name = Some(key.to_string());
            news.image_url = Some(url);
            true
        }
        None => false,
    };

    if let Err(e) = services.news.update(&news).await {
        if uploaded {
            services
                .discard_image(news.file_name.as_deref(), news.image_url.as_deref())
                .await;
        }
        return Err(e.into());
    }
    if uploaded {
        services
            .discard_image(previous_image.0.as_deref(), previous_image.1.as_deref())
            .await;
    }

    tracing::info!(news_id = %news.id, thumbnail_replaced = uploaded, "news updated");
    Ok(dto::success(StatusCode::OK, "news updated", NewsView::from(news)))
}

pub async fn delete_news(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let news = authored_news(&services, &principal, &id).await?;

    // blob first: a failure here leaves the row, so the delete can be retried
    services
        .delete_image(news.file_name.as_deref(), news.image_url.as_deref())
        .await?;
    services.news.delete(news.id).await?;

    tracing::info!(news_id = %news.id, "news deleted");
    Ok(dto::success(
        StatusCode::OK,
        "news deleted",
        json!({ "newsId": news.id.to_string() }),
    ))
}
