use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use super::{IdPath, parse_page};
use crate::{
    AppState,
    catalog::{GenreView, MovieView},
    error::{AppError, AppResult},
};

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    page: Option<String>,
    page_size: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LocalPage {
    pub count: u64,
    pub next: Option<u64>,
    pub previous: Option<u64>,
    pub results: Vec<MovieView>,
}

/// Unparseable sizes fall back to the default; large ones are capped.
fn page_size(raw: Option<&str>) -> u64 {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|n| *n > 0)
        .map(|n| n.min(MAX_PAGE_SIZE))
        .unwrap_or(DEFAULT_PAGE_SIZE)
}

pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<LocalPage>> {
    let page = u64::from(parse_page(q.page.as_deref())?);
    let size = page_size(q.page_size.as_deref());

    let listing = state.catalog.list_movies(page, size).await?;
    if page > listing.pages.max(1) {
        return Err(AppError::not_found("Invalid page."));
    }

    let results = state.catalog.movie_views(listing.items, &state.images).await?;
    Ok(Json(LocalPage {
        count: listing.count,
        next: (page < listing.pages).then_some(page + 1),
        previous: (page > 1).then_some(page - 1),
        results,
    }))
}

pub async fn movie_detail(
    State(state): State<Arc<AppState>>,
    IdPath(movie_id): IdPath,
) -> AppResult<Json<MovieView>> {
    let movie = state.catalog.movie(movie_id).await?.ok_or_else(|| AppError::not_found("Not found."))?;
    let mut views = state.catalog.movie_views(vec![movie], &state.images).await?;
    views.pop().map(Json).ok_or_else(|| AppError::not_found("Not found."))
}

pub async fn list_genres(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<GenreView>>> {
    let genres = state.catalog.genres().await?;
    Ok(Json(genres.into_iter().map(GenreView::from).collect()))
}
