use axum::{
    routing::{get, post},
    Router,
};

pub mod news;
pub mod predict;
pub mod saved_news;
pub mod system;
pub mod users;

/// Endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
}

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/predict", post(predict::predict))
        .nest("/users", users::router())
        .nest("/news", news::router())
        .nest("/savedNews", saved_news::router())
}
