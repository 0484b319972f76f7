use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequestParts, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    AppState,
    accounts::{ProfileUpdate, Registration, UserView},
    entities::user,
    error::{AppError, AppResult},
};

/// The user behind a valid `Authorization: Bearer <access token>` header.
#[derive(Debug)]
pub struct AuthUser(pub user::Model);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Err(AppError::unauthorized("Authentication credentials were not provided."));
        };
        match state.accounts.user_for_access_token(token).await? {
            Some(user) => Ok(AuthUser(user)),
            None => {
                debug!("rejected unknown or expired access token");
                Err(AppError::unauthorized("Given token not valid for any token type"))
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    access: String,
    refresh: String,
    user: UserView,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    refresh: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    access: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<Registration>,
) -> AppResult<(StatusCode, Json<UserView>)> {
    let user = state.accounts.register(req).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let user = state.accounts.authenticate(&req.email, &req.password).await?;
    let tokens = state.accounts.issue_tokens(user.id).await?;
    Ok(Json(LoginResponse { access: tokens.access, refresh: tokens.refresh, user: user.into() }))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<Json<RefreshResponse>> {
    let access = state.accounts.refresh(req.refresh.trim()).await?;
    Ok(Json(RefreshResponse { access }))
}

pub async fn profile(AuthUser(user): AuthUser) -> Json<UserView> {
    Json(user.into())
}

/// Full update: email and username must both be present.
pub async fn replace_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<Json<UserView>> {
    if update.email.is_none() || update.username.is_none() {
        return Err(AppError::bad_request("email and username are required"));
    }
    let user = state.accounts.update_profile(user, update).await?;
    Ok(Json(user.into()))
}

pub async fn patch_profile(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<Json<UserView>> {
    let user = state.accounts.update_profile(user, update).await?;
    Ok(Json(user.into()))
}
