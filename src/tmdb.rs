use std::{num::NonZeroU32, sync::Arc};

use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{error, info};

use crate::{
    config::TmdbConfig,
    models::{DiscoverQuery, GenreList, RemoteMovieDetail, RemotePage, SortBy, TimeWindow},
};

/// Minimum vote count applied by the genre-filtered discovery helper.
pub const GENRE_MIN_VOTE_COUNT: u32 = 50;

#[derive(Debug, thiserror::Error)]
pub enum TmdbError {
    #[error("Either TMDB_BEARER_TOKEN or TMDB_API_KEY environment variable is required")]
    MissingCredentials,
    #[error("request error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("http status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("json decode error: {0}")]
    Decode(#[source] serde_json::Error),
}

impl TmdbError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TmdbError::Status { status: 404, .. })
    }
}

pub type TmdbResult<T> = Result<T, TmdbError>;

#[derive(Clone, Debug)]
enum Credentials {
    BearerToken(String),
    ApiKey(String),
}

pub struct TmdbClient {
    client: reqwest::Client,
    credentials: Credentials,
    base_url: String,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl TmdbClient {
    pub fn new(client: reqwest::Client, config: &TmdbConfig) -> TmdbResult<Self> {
        let credentials = match (&config.bearer_token, &config.api_key) {
            (Some(token), _) => Credentials::BearerToken(token.clone()),
            (None, Some(key)) => Credentials::ApiKey(key.clone()),
            (None, None) => return Err(TmdbError::MissingCredentials),
        };

        let rps = NonZeroU32::new(config.rps).unwrap_or(NonZeroU32::MIN);
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(rps)));
        Ok(Self {
            client,
            credentials,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limiter,
        })
    }

    /// Healthy when the genre list can be fetched.
    pub async fn test_connection(&self) -> bool {
        self.genres().await.is_ok()
    }

    pub async fn popular(&self, page: u32) -> TmdbResult<RemotePage> {
        info!(page, "fetching popular movies from tmdb");
        self.get("movie/popular", &[("page", page.to_string())]).await
    }

    pub async fn top_rated(&self, page: u32) -> TmdbResult<RemotePage> {
        self.get("movie/top_rated", &[("page", page.to_string())]).await
    }

    pub async fn now_playing(&self, page: u32) -> TmdbResult<RemotePage> {
        self.get("movie/now_playing", &[("page", page.to_string())]).await
    }

    pub async fn upcoming(&self, page: u32) -> TmdbResult<RemotePage> {
        self.get("movie/upcoming", &[("page", page.to_string())]).await
    }

    pub async fn movie_details(&self, tmdb_id: i32) -> TmdbResult<RemoteMovieDetail> {
        self.get(&format!("movie/{tmdb_id}"), &[]).await
    }

    pub async fn credits(&self, tmdb_id: i32) -> TmdbResult<Value> {
        self.get(&format!("movie/{tmdb_id}/credits"), &[]).await
    }

    pub async fn videos(&self, tmdb_id: i32) -> TmdbResult<Value> {
        self.get(&format!("movie/{tmdb_id}/videos"), &[]).await
    }

    pub async fn similar(&self, tmdb_id: i32, page: u32) -> TmdbResult<RemotePage> {
        self.get(&format!("movie/{tmdb_id}/similar"), &[("page", page.to_string())]).await
    }

    pub async fn recommendations(&self, tmdb_id: i32, page: u32) -> TmdbResult<RemotePage> {
        self.get(&format!("movie/{tmdb_id}/recommendations"), &[("page", page.to_string())])
            .await
    }

    pub async fn search(&self, query: &str, page: u32) -> TmdbResult<RemotePage> {
        self.get("search/movie", &[("query", query.to_string()), ("page", page.to_string())])
            .await
    }

    pub async fn genres(&self) -> TmdbResult<GenreList> {
        self.get("genre/movie/list", &[]).await
    }

    pub async fn trending(&self, window: TimeWindow, page: u32) -> TmdbResult<RemotePage> {
        self.get(&format!("trending/movie/{}", window.as_str()), &[("page", page.to_string())])
            .await
    }

    pub async fn discover(&self, query: &DiscoverQuery) -> TmdbResult<RemotePage> {
        let params = query.to_params();
        let params: Vec<(&str, String)> =
            params.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
        self.get("discover/movie", &params).await
    }

    pub async fn movies_by_genre(
        &self,
        genre_ids: &[i32],
        page: u32,
        sort_by: SortBy,
    ) -> TmdbResult<RemotePage> {
        let with_genres =
            genre_ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",");
        self.discover(&DiscoverQuery {
            with_genres: Some(with_genres),
            sort_by: Some(sort_by),
            vote_count_gte: Some(GENRE_MIN_VOTE_COUNT),
            page: Some(page),
            ..Default::default()
        })
        .await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> TmdbResult<T> {
        self.limiter.until_ready().await;

        let url = format!("{}/{}", self.base_url, endpoint);
        let mut req = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .query(params);
        req = match &self.credentials {
            Credentials::BearerToken(token) => req.bearer_auth(token),
            Credentials::ApiKey(key) => req.query(&[("api_key", key)]),
        };

        let result = Self::send(req).await;
        if let Err(err) = &result {
            error!(endpoint, error = %err, "tmdb request failed");
        }
        result
    }

    async fn send<T: DeserializeOwned>(req: reqwest::RequestBuilder) -> TmdbResult<T> {
        let resp = req.send().await.map_err(TmdbError::Network)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TmdbError::Status { status: status.as_u16(), body });
        }
        let bytes = resp.bytes().await.map_err(TmdbError::Network)?;
        serde_json::from_slice(&bytes).map_err(TmdbError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_requires_a_credential() {
        let err = TmdbClient::new(reqwest::Client::new(), &TmdbConfig::default()).err();
        assert!(matches!(err, Some(TmdbError::MissingCredentials)));
    }

    #[test]
    fn bearer_token_wins_over_api_key() {
        let config = TmdbConfig {
            bearer_token: Some("token".into()),
            api_key: Some("key".into()),
            ..Default::default()
        };
        let client = TmdbClient::new(reqwest::Client::new(), &config).unwrap();
        assert!(matches!(client.credentials, Credentials::BearerToken(ref t) if t == "token"));
    }
}
