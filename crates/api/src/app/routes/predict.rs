use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::Response,
    Json,
};
use chrono::Utc;

use crate::app::dto::{self, PredictRequest, PredictionView};
use crate::app::errors::ApiError;
use crate::app::services::{blocking, AppServices};

pub async fn predict(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload?;
    if body.text.trim().is_empty() {
        return Err(ApiError::validation("text must not be empty"));
    }

    let slot = services.classifier.clone();
    let text = body.text;
    let verdict = blocking(move || slot.get()?.predict(&text)).await??;

    let view = PredictionView::new(&verdict, Utc::now());
    tracing::info!(
        prediction_id = %view.id,
        label = view.label,
        score = view.score,
        "prediction made"
    );
    Ok(dto::success(StatusCode::CREATED, "prediction made", view))
}
