use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::warn;

use super::{IdPath, parse_page};
use crate::{
    AppState,
    error::{AppError, AppResult},
    models::{
        DiscoverQuery, Envelope, GenreList, MovieDetailItem, RemotePage, SortBy, TimeWindow,
    },
    tmdb::{GENRE_MIN_VOTE_COUNT, TmdbResult},
};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
    page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    time_window: Option<String>,
    page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ByGenreQuery {
    genres: Option<String>,
    sort_by: Option<String>,
    page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DiscoverParams {
    with_genres: Option<String>,
    primary_release_year: Option<String>,
    vote_average_gte: Option<String>,
    vote_count_gte: Option<String>,
    sort_by: Option<String>,
    page: Option<String>,
}

fn envelope(
    state: &AppState,
    data: TmdbResult<RemotePage>,
    absent: AppError,
) -> AppResult<Json<Envelope>> {
    let page = data.map_err(|_| absent)?;
    Ok(Json(Envelope::from_page(page, &state.images)))
}

fn unavailable() -> AppError {
    AppError::unavailable("Unable to fetch data from TMDb API")
}

fn parse_sort_by(raw: Option<&str>) -> AppResult<SortBy> {
    match raw {
        None => Ok(SortBy::default()),
        Some(s) => s.trim().parse().map_err(|err: crate::models::InvalidSortBy| {
            AppError::bad_request(err.to_string())
        }),
    }
}

fn parse_genre_ids(raw: &str) -> Option<Vec<i32>> {
    raw.split(',').map(|id| id.trim().parse().ok()).collect()
}

pub async fn popular(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PageQuery>,
) -> AppResult<Json<Envelope>> {
    let tmdb = state.tmdb()?;
    let page = parse_page(q.page.as_deref())?;
    envelope(&state, tmdb.popular(page).await, unavailable())
}

pub async fn top_rated(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PageQuery>,
) -> AppResult<Json<Envelope>> {
    let tmdb = state.tmdb()?;
    let page = parse_page(q.page.as_deref())?;
    envelope(&state, tmdb.top_rated(page).await, unavailable())
}

pub async fn now_playing(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PageQuery>,
) -> AppResult<Json<Envelope>> {
    let tmdb = state.tmdb()?;
    let page = parse_page(q.page.as_deref())?;
    envelope(&state, tmdb.now_playing(page).await, unavailable())
}

pub async fn upcoming(
    State(state): State<Arc<AppState>>,
    Query(q): Query<PageQuery>,
) -> AppResult<Json<Envelope>> {
    let tmdb = state.tmdb()?;
    let page = parse_page(q.page.as_deref())?;
    envelope(&state, tmdb.upcoming(page).await, unavailable())
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SearchQuery>,
) -> AppResult<Json<Envelope>> {
    let query = q.q.as_deref().map(str::trim).unwrap_or_default().to_string();
    if query.is_empty() {
        return Err(AppError::bad_request("Query parameter \"q\" is required"));
    }
    let tmdb = state.tmdb()?;
    let page = parse_page(q.page.as_deref())?;

    let Json(mut out) = envelope(
        &state,
        tmdb.search(&query, page).await,
        AppError::unavailable("Unable to perform search"),
    )?;
    out.query = Some(query);
    Ok(Json(out))
}

pub async fn movie_detail(
    State(state): State<Arc<AppState>>,
    IdPath(tmdb_id): IdPath,
) -> AppResult<Json<MovieDetailItem>> {
    let tmdb = state.tmdb()?;
    let detail = tmdb.movie_details(tmdb_id).await.map_err(|err| {
        if !err.is_not_found() {
            warn!(tmdb_id, error = %err, "movie detail lookup failed");
        }
        AppError::not_found("Movie not found")
    })?;
    Ok(Json(MovieDetailItem::project(detail, &state.images)))
}

pub async fn genres(State(state): State<Arc<AppState>>) -> AppResult<Json<GenreList>> {
    let tmdb = state.tmdb()?;
    let list = tmdb
        .genres()
        .await
        .map_err(|_| AppError::unavailable("Unable to fetch genres from TMDb API"))?;
    Ok(Json(list))
}

pub async fn similar(
    State(state): State<Arc<AppState>>,
    IdPath(movie_id): IdPath,
    Query(q): Query<PageQuery>,
) -> AppResult<Json<Envelope>> {
    let tmdb = state.tmdb()?;
    let page = parse_page(q.page.as_deref())?;
    envelope(
        &state,
        tmdb.similar(movie_id, page).await,
        AppError::not_found("Movie not found or no similar movies available"),
    )
}

pub async fn recommendations(
    State(state): State<Arc<AppState>>,
    IdPath(movie_id): IdPath,
    Query(q): Query<PageQuery>,
) -> AppResult<Json<Envelope>> {
    let tmdb = state.tmdb()?;
    let page = parse_page(q.page.as_deref())?;
    envelope(
        &state,
        tmdb.recommendations(movie_id, page).await,
        AppError::not_found("Movie not found or no recommendations available"),
    )
}

pub async fn trending(
    State(state): State<Arc<AppState>>,
    Query(q): Query<TrendingQuery>,
) -> AppResult<Json<Envelope>> {
    let tmdb = state.tmdb()?;
    let window = match q.time_window.as_deref() {
        None => TimeWindow::default(),
        Some(raw) => TimeWindow::parse(raw.trim())
            .ok_or_else(|| AppError::bad_request("time_window must be \"day\" or \"week\""))?,
    };
    let page = parse_page(q.page.as_deref())?;
    envelope(
        &state,
        tmdb.trending(window, page).await,
        AppError::unavailable("Unable to fetch trending movies"),
    )
}

pub async fn by_genre(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ByGenreQuery>,
) -> AppResult<Json<Envelope>> {
    let tmdb = state.tmdb()?;
    let raw = q.genres.as_deref().map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(AppError::bad_request(
            "genres parameter is required (comma-separated genre IDs)",
        ));
    }
    let genre_ids = parse_genre_ids(raw)
        .ok_or_else(|| AppError::bad_request("Invalid genre IDs or page number"))?;
    let sort_by = parse_sort_by(q.sort_by.as_deref())?;
    let page = parse_page(q.page.as_deref())
        .map_err(|_| AppError::bad_request("Invalid genre IDs or page number"))?;

    envelope(
        &state,
        tmdb.movies_by_genre(&genre_ids, page, sort_by).await,
        AppError::unavailable("Unable to fetch movies for the specified genres"),
    )
}

pub async fn discover(
    State(state): State<Arc<AppState>>,
    Query(q): Query<DiscoverParams>,
) -> AppResult<Json<Envelope>> {
    let tmdb = state.tmdb()?;
    let query = discover_query(&q)?;
    envelope(
        &state,
        tmdb.discover(&query).await,
        AppError::unavailable("Unable to discover movies with the specified criteria"),
    )
}

fn discover_query(q: &DiscoverParams) -> AppResult<DiscoverQuery> {
    fn parse<T: std::str::FromStr>(name: &str, raw: Option<&str>) -> AppResult<Option<T>> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(s) => s.parse().map(Some).map_err(|_| {
                AppError::bad_request(format!("Invalid parameter value: {name}={s}"))
            }),
        }
    }

    let vote_average_gte = parse::<f64>("vote_average_gte", q.vote_average_gte.as_deref())?;
    if vote_average_gte.is_some_and(|v| !v.is_finite()) {
        return Err(AppError::bad_request("Invalid parameter value: vote_average_gte"));
    }

    Ok(DiscoverQuery {
        with_genres: q
            .with_genres
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        sort_by: Some(parse_sort_by(q.sort_by.as_deref())?),
        vote_count_gte: Some(
            parse::<u32>("vote_count_gte", q.vote_count_gte.as_deref())?
                .unwrap_or(GENRE_MIN_VOTE_COUNT),
        ),
        vote_average_gte,
        primary_release_year: parse("primary_release_year", q.primary_release_year.as_deref())?,
        page: Some(parse_page(q.page.as_deref())?),
        extra: Vec::new(),
    })
}
