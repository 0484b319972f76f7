use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{AuthUser, IdPath};
use crate::{
    AppState,
    accounts::{Collection, CollectionEntry},
    catalog::{MovieView, format_timestamp},
    error::{AppError, AppResult},
};

#[derive(Debug, Deserialize)]
pub struct AddEntry {
    movie_id: i32,
}

#[derive(Debug, Serialize)]
pub struct EntryView {
    pub id: i32,
    pub movie: MovieView,
    pub created_at: String,
}

async fn render(state: &AppState, entries: Vec<CollectionEntry>) -> AppResult<Vec<EntryView>> {
    let meta: Vec<(i32, i64)> = entries.iter().map(|e| (e.id, e.created_at)).collect();
    let movies = entries.into_iter().map(|e| e.movie).collect();
    let views = state.catalog.movie_views(movies, &state.images).await?;
    Ok(meta
        .into_iter()
        .zip(views)
        .map(|((id, created_at), movie)| EntryView {
            id,
            movie,
            created_at: format_timestamp(created_at),
        })
        .collect())
}

async fn list(state: &AppState, user_id: i32, which: Collection) -> AppResult<Json<Vec<EntryView>>> {
    let entries = state.accounts.list(user_id, which).await?;
    Ok(Json(render(state, entries).await?))
}

async fn add(
    state: &AppState,
    user_id: i32,
    which: Collection,
    movie_id: i32,
) -> AppResult<(StatusCode, Json<EntryView>)> {
    let entry = state.accounts.add(user_id, which, movie_id).await?;
    let view = render(state, vec![entry])
        .await?
        .pop()
        .ok_or_else(|| AppError::not_found("Movie not found."))?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn check(
    state: &AppState,
    user_id: i32,
    which: Collection,
    movie_id: i32,
    key: &str,
) -> AppResult<Json<Value>> {
    if state.catalog.movie(movie_id).await?.is_none() {
        return Err(AppError::not_found("Movie not found"));
    }
    let present = state.accounts.contains(user_id, which, movie_id).await?;
    Ok(Json(json!({ key: present })))
}

pub async fn list_favorites(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<EntryView>>> {
    list(&state, user.id, Collection::Favorites).await
}

pub async fn add_favorite(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<AddEntry>,
) -> AppResult<(StatusCode, Json<EntryView>)> {
    add(&state, user.id, Collection::Favorites, req.movie_id).await
}

pub async fn remove_favorite(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    IdPath(id): IdPath,
) -> AppResult<StatusCode> {
    state.accounts.remove(user.id, Collection::Favorites, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn check_favorite(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    IdPath(movie_id): IdPath,
) -> AppResult<Json<Value>> {
    check(&state, user.id, Collection::Favorites, movie_id, "is_favorite").await
}

pub async fn list_watchlist(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
) -> AppResult<Json<Vec<EntryView>>> {
    list(&state, user.id, Collection::Watchlist).await
}

pub async fn add_to_watchlist(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Json(req): Json<AddEntry>,
) -> AppResult<(StatusCode, Json<EntryView>)> {
    add(&state, user.id, Collection::Watchlist, req.movie_id).await
}

pub async fn remove_from_watchlist(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    IdPath(id): IdPath,
) -> AppResult<StatusCode> {
    state.accounts.remove(user.id, Collection::Watchlist, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn check_watchlist(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    IdPath(movie_id): IdPath,
) -> AppResult<Json<Value>> {
    check(&state, user.id, Collection::Watchlist, movie_id, "is_in_watchlist").await
}
