use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Multipart, Path},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use factha_auth::{authorize_owner, JwtIssuer, TokenSubject};
use factha_core::{normalize_email, validate_name, validate_password, User, UserId};
use factha_infra::storage::Folder;

use crate::app::dto::{self, LoginRequest, LoginResult, RegisterRequest, RegisteredUser, UserView};
use crate::app::errors::ApiError;
use crate::app::services::{blocking, AppServices};
use crate::app::upload::FormData;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users))
        .route("/:id", get(get_user).put(update_user))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload?;

    let name = validate_name(&body.name)?;
    let email = normalize_email(&body.email)?;
    validate_password(&body.password)?;

    if services.users.find_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict("email already registered".to_string()));
    }

    let hasher = services.passwords.clone();
    let password = body.password;
    let password_hash = blocking(move || hasher.hash(&password)).await??;

    let user = User::register(name, email, password_hash, Utc::now());
    services.users.insert(&user).await?;
    tracing::info!(user_id = %user.id, "user registered");

    Ok(dto::success(
        StatusCode::CREATED,
        "user registered",
        RegisteredUser {
            user_id: user.id.to_string(),
            name: user.name,
            email: user.email,
        },
    ))
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload?;
    let email = normalize_email(&body.email)?;

    let user = services
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::not_found("email is not registered"))?;

    let hasher = services.passwords.clone();
    let stored = user.password_hash.clone();
    let password = body.password;
    if !blocking(move || hasher.verify(&password, &stored)).await?? {
        return Err(ApiError::Unauthorized("wrong password".to_string()));
    }

    let subject = TokenSubject {
        user_id: user.id,
        email: user.email.clone(),
        name: user.name.clone(),
    };
    let token = services
        .jwt
        .issue(&subject, Utc::now())
        .map_err(|e| ApiError::internal(format!("failed to issue token: {e}")))?;

    Ok(dto::success(
        StatusCode::OK,
        "login success",
        LoginResult {
            user_id: user.id.to_string(),
            name: user.name,
            token,
        },
    ))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Response, ApiError> {
    let users: Vec<UserView> = services
        .users
        .list()
        .await?
        .into_iter()
        .map(UserView::from)
        .collect();
    Ok(dto::success(StatusCode::OK, "users", users))
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: UserId = id.parse()?;
    let user = services
        .users
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;
    Ok(dto::success(StatusCode::OK, "user", UserView::from(user)))
}

/// Multipart: `name`, `email`, `oldPassword`, optional `newPassword`, `body`, `image`.
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let id: UserId = id.parse()?;
    authorize_owner(principal.user_id(), id, "user profile")?;

    let mut user = services
        .users
        .get(id)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    let mut form = FormData::read(multipart, "image").await?;
    let name = validate_name(form.required("name")?)?;
    let email = normalize_email(form.required("email")?)?;
    let old_password = form.required("oldPassword")?.to_string();
    let new_password = form
        .text("newPassword")
        .filter(|p| !p.is_empty())
        .map(str::to_string);
    if let Some(p) = &new_password {
        validate_password(p)?;
    }

    let hasher = services.passwords.clone();
    let stored = user.password_hash.clone();
    if !blocking(move || hasher.verify(&old_password, &stored)).await?? {
        return Err(ApiError::Unauthorized("old password does not match".to_string()));
    }

    if let Some(other) = services.users.find_by_email(&email).await? {
        if other.id != user.id {
            return Err(ApiError::Conflict("email already registered".to_string()));
        }
    }

    if let Some(p) = new_password {
        let hasher = services.passwords.clone();
        user.password_hash = blocking(move || hasher.hash(&p)).await??;
    }
    user.name = name;
    user.email = email;
    if let Some(bio) = form.text("body") {
        let bio = bio.trim();
        user.bio = (!bio.is_empty()).then(|| bio.to_string());
    }

    let previous_image = (user.file_name.clone(), user.image_url.clone());
    let uploaded = match form.take_file() {
        Some(file) => {
            let (key, url) = services.store_image(Folder::ProfilePictures, file).await?;
            user.file_name = Some(key.to_string());
            user.image_url = Some(url);
            true
        }
        None => false,
    };
    user.touch(Utc::now());

    if let Err(e) = services.users.update(&user).await {
        if uploaded {
            services
                .discard_image(user.file_name.as_deref(), user.image_url.as_deref())
                .await;
        }
        return Err(e.into());
    }
    if uploaded {
        services
            .discard_image(previous_image.0.as_deref(), previous_image.1.as_deref())
            .await;
    }

    tracing::info!(user_id = %user.id, image_replaced = uploaded, "user updated");
    Ok(dto::success(StatusCode::OK, "user updated", UserView::from(user)))
}
