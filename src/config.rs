use std::net::SocketAddr;

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub tmdb: TmdbConfig,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
}

/// Credentials and endpoints for the movie metadata provider.
#[derive(Clone, Debug)]
pub struct TmdbConfig {
    pub bearer_token: Option<String>,
    pub api_key: Option<String>,
    pub base_url: String,
    pub image_base_url: String,
    pub rps: u32,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            bearer_token: None,
            api_key: None,
            base_url: "https://api.themoviedb.org/3".to_string(),
            image_base_url: "https://image.tmdb.org/t/p".to_string(),
            rps: 20,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "8000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://popcornflix.db?mode=rwc".to_string());

        let defaults = TmdbConfig::default();
        let tmdb = TmdbConfig {
            bearer_token: non_empty_var("TMDB_BEARER_TOKEN"),
            api_key: non_empty_var("TMDB_API_KEY"),
            base_url: std::env::var("TMDB_BASE_URL").unwrap_or(defaults.base_url),
            image_base_url: std::env::var("TMDB_IMAGE_BASE_URL")
                .unwrap_or(defaults.image_base_url),
            rps: std::env::var("TMDB_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rps),
        };

        let access_token_ttl_secs: i64 = std::env::var("ACCESS_TOKEN_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(300);

        let refresh_token_ttl_secs: i64 = std::env::var("REFRESH_TOKEN_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(86_400);

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            tmdb,
            access_token_ttl_secs,
            refresh_token_ttl_secs,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
