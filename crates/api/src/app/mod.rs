//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: repositories, blob storage, classifier, auth primitives
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and the response envelope
//! - `upload.rs`: multipart form reading
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, routing::get, Extension, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use factha_infra::Settings;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;
pub mod upload;

/// Build the full HTTP router from settings (public entrypoint used by `main.rs`).
pub async fn build_app(settings: &Settings) -> anyhow::Result<Router> {
    let services = Arc::new(services::build_services(settings).await?);
    Ok(build_router(services, settings.server.max_upload_bytes))
}

/// Build the router around already wired services.
pub fn build_router(services: Arc<services::AppServices>, max_body_bytes: usize) -> Router {
    let auth_state = middleware::AuthState {
        jwt: services.jwt.clone(),
    };

    // Protected routes: require a valid bearer token.
    let protected = routes::router()
        .layer(Extension(services.clone()))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    let public = routes::public_router().layer(Extension(services));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Enforced by the Json/Multipart extractors, so oversized bodies are
    // rejected through `ApiError` with the usual envelope.
    Router::new()
        .route("/health", get(routes::system::health))
        .merge(public)
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(max_body_bytes)),
        )
}
