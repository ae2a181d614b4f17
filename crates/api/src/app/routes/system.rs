use axum::{extract::Extension, http::StatusCode, response::Response};

use crate::app::dto::{self, WhoAmI};
use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> Response {
    dto::success(
        StatusCode::OK,
        "authenticated",
        WhoAmI {
            user_id: principal.user_id().to_string(),
            email: principal.email().to_string(),
            name: principal.name().to_string(),
        },
    )
}
