mod auth;
mod collections;
mod local;
mod proxy;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequestParts, Path},
    http::request::Parts,
    routing::{delete, get, post},
};
use serde_json::{Value, json};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use auth::AuthUser;

use crate::{
    AppState,
    error::{AppError, AppResult},
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api", get(api_root))
        .route("/api/health", get(health))
        // local catalog
        .route("/api/movies", get(local::list_movies))
        .route("/api/movies/{movie_id}", get(local::movie_detail))
        .route("/api/genres", get(local::list_genres))
        // vendor proxy
        .route("/api/tmdb/popular", get(proxy::popular))
        .route("/api/tmdb/top-rated", get(proxy::top_rated))
        .route("/api/tmdb/now-playing", get(proxy::now_playing))
        .route("/api/tmdb/upcoming", get(proxy::upcoming))
        .route("/api/tmdb/search", get(proxy::search))
        .route("/api/tmdb/movie/{tmdb_id}", get(proxy::movie_detail))
        .route("/api/tmdb/genres", get(proxy::genres))
        .route("/api/recommendations/similar/{movie_id}", get(proxy::similar))
        .route("/api/recommendations/based-on/{movie_id}", get(proxy::recommendations))
        .route("/api/recommendations/trending", get(proxy::trending))
        .route("/api/recommendations/by-genre", get(proxy::by_genre))
        .route("/api/recommendations/discover", get(proxy::discover))
        // accounts
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/token/refresh", post(auth::refresh))
        .route(
            "/api/auth/profile",
            get(auth::profile).put(auth::replace_profile).patch(auth::patch_profile),
        )
        .route(
            "/api/auth/favorites",
            get(collections::list_favorites).post(collections::add_favorite),
        )
        .route("/api/auth/favorites/{id}", delete(collections::remove_favorite))
        .route("/api/auth/favorites/check/{movie_id}", get(collections::check_favorite))
        .route(
            "/api/auth/watchlist",
            get(collections::list_watchlist).post(collections::add_to_watchlist),
        )
        .route("/api/auth/watchlist/{id}", delete(collections::remove_from_watchlist))
        .route("/api/auth/watchlist/check/{movie_id}", get(collections::check_watchlist))
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any))
        .layer(TraceLayer::new_for_http())
}

/// Static liveness payload; does not contact TMDb.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "Popcornflix API with TMDb integration is running!",
        "features": [
            "SQLite database",
            "TMDb API integration",
            "Movie management",
            "REST API",
            "CORS enabled",
            "Movie recommendations",
        ],
    }))
}

pub async fn api_root() -> Json<Value> {
    Json(json!({
        "message": "Welcome to Popcornflix API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/api/health",
            "authentication": {
                "register": "/api/auth/register",
                "login": "/api/auth/login",
                "refresh": "/api/auth/token/refresh",
                "profile": "/api/auth/profile",
            },
            "user_features": {
                "favorites": "/api/auth/favorites",
                "watchlist": "/api/auth/watchlist",
                "check_favorite": "/api/auth/favorites/check/{movie_id}",
                "check_watchlist": "/api/auth/watchlist/check/{movie_id}",
            },
            "movies": {
                "local_movies": "/api/movies",
                "local_movie_detail": "/api/movies/{id}",
                "genres": "/api/genres",
            },
            "tmdb": {
                "popular": "/api/tmdb/popular",
                "top_rated": "/api/tmdb/top-rated",
                "now_playing": "/api/tmdb/now-playing",
                "upcoming": "/api/tmdb/upcoming",
                "search": "/api/tmdb/search?q={query}",
                "movie_detail": "/api/tmdb/movie/{tmdb_id}",
                "genres": "/api/tmdb/genres",
            },
            "recommendations": {
                "similar_movies": "/api/recommendations/similar/{movie_id}",
                "based_on_movie": "/api/recommendations/based-on/{movie_id}",
                "trending": "/api/recommendations/trending",
                "by_genre": "/api/recommendations/by-genre?genres={genre_ids}",
                "discover": "/api/recommendations/discover",
            },
        },
    }))
}

/// A single integer path segment. Malformed ids are a JSON 400 like every other client error.
#[derive(Debug)]
pub struct IdPath(pub i32);

impl<S: Send + Sync> FromRequestParts<S> for IdPath {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i32>::from_request_parts(parts, state)
            .await
            .map_err(|rej| AppError::bad_request(rej.body_text()))?;
        Ok(IdPath(id))
    }
}

/// `page` must be a positive integer; absent means the first page.
pub(crate) fn parse_page(raw: Option<&str>) -> AppResult<u32> {
    let Some(raw) = raw else {
        return Ok(1);
    };
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|page| *page >= 1)
        .ok_or_else(|| AppError::bad_request("Invalid page number"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_numbers() {
        assert_eq!(parse_page(None).unwrap(), 1);
        assert_eq!(parse_page(Some("3")).unwrap(), 3);
        assert!(parse_page(Some("0")).is_err());
        assert!(parse_page(Some("abc")).is_err());
        assert!(parse_page(Some("-2")).is_err());
        assert!(parse_page(Some("")).is_err());
    }
}
