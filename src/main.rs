mod accounts;
mod catalog;
mod config;
mod db;
mod entities;
mod error;
mod models;
mod routes;
mod sync;
mod tmdb;

#[cfg(test)]
mod tests;

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::{
    accounts::Accounts,
    catalog::Catalog,
    config::Config,
    error::AppResult,
    models::{ImageBase, SortBy, TimeWindow},
    tmdb::{TmdbClient, TmdbError},
};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub accounts: Accounts,
    pub tmdb: Option<Arc<TmdbClient>>,
    pub images: ImageBase,
}

impl AppState {
    /// Fails with a configuration error when no TMDb credential is set.
    pub fn tmdb(&self) -> AppResult<&TmdbClient> {
        self.tmdb.as_deref().ok_or_else(|| TmdbError::MissingCredentials.into())
    }
}

#[derive(Parser, Debug)]
#[command(name = "popcornflix", version)]
#[command(about = "Movie catalog API with TMDb sync and proxy", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Mirror the TMDb genre list into the local database
    SyncGenres,
    /// Mirror pages of TMDb popular movies; run sync-genres first
    SyncMovies {
        #[arg(long, default_value_t = sync::DEFAULT_MOVIE_PAGES)]
        pages: u32,
    },
    /// Check TMDb connectivity and exercise the endpoints the API uses
    CheckTmdb {
        #[arg(long, default_value_t = 550)]
        movie_id: i32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,popcornflix=debug,sqlx=warn".to_string()),
        )
        .init();

    let cli = Cli::parse();
    let config = Arc::new(Config::from_env()?);

    let http = reqwest::Client::builder()
        .user_agent(concat!("popcornflix/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(30))
        .build()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, http).await,
        Command::SyncGenres => {
            let tmdb = TmdbClient::new(http, &config.tmdb)?;
            let catalog = Catalog::new(db::connect_and_migrate(&config.database_url).await?);
            let report = sync::sync_genres(&tmdb, &catalog).await?;
            println!("Successfully synced genres: {report}");
            Ok(())
        },
        Command::SyncMovies { pages } => {
            let tmdb = TmdbClient::new(http, &config.tmdb)?;
            let catalog = Catalog::new(db::connect_and_migrate(&config.database_url).await?);
            let report = sync::sync_popular_movies(&tmdb, &catalog, pages).await?;
            println!("Successfully synced movies: {report}");
            Ok(())
        },
        Command::CheckTmdb { movie_id } => {
            let tmdb = TmdbClient::new(http, &config.tmdb)?;
            check_tmdb(&tmdb, movie_id).await
        },
    }
}

async fn serve(config: Arc<Config>, http: reqwest::Client) -> anyhow::Result<()> {
    let db = db::connect_and_migrate(&config.database_url).await?;

    let tmdb = match TmdbClient::new(http, &config.tmdb) {
        Ok(client) => Some(Arc::new(client)),
        Err(err) => {
            tracing::warn!(error = %err, "tmdb proxy endpoints disabled");
            None
        },
    };

    let state = Arc::new(AppState {
        catalog: Catalog::new(db.clone()),
        accounts: Accounts::new(db, config.access_token_ttl_secs, config.refresh_token_ttl_secs),
        tmdb,
        images: ImageBase::new(config.tmdb.image_base_url.clone()),
    });

    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn check_tmdb(tmdb: &TmdbClient, movie_id: i32) -> anyhow::Result<()> {
    println!("Testing TMDb API connection...");
    if !tmdb.test_connection().await {
        anyhow::bail!(
            "TMDb API connection failed, check TMDB_BEARER_TOKEN or TMDB_API_KEY"
        );
    }
    println!("TMDb API connection successful");

    fn report(label: &str, count: Option<usize>) {
        match count {
            Some(n) if n > 0 => println!("  ok   {label}: {n} results"),
            Some(_) => println!("  warn {label}: no results"),
            None => println!("  fail {label}: request failed"),
        }
    }

    report("popular", tmdb.popular(1).await.ok().map(|p| p.results.len()));
    report("genres", tmdb.genres().await.ok().map(|g| g.genres.len()));
    report("search \"batman\"", tmdb.search("batman", 1).await.ok().map(|p| p.results.len()));

    let detail = tmdb.movie_details(movie_id).await.context("movie details")?;
    println!(
        "  ok   details: {} ({})",
        detail.movie.title.unwrap_or_default(),
        detail.movie.release_date.unwrap_or_default()
    );
    report(
        "credits (cast)",
        tmdb.credits(movie_id).await.ok().map(|v| v["cast"].as_array().map_or(0, Vec::len)),
    );
    report(
        "videos",
        tmdb.videos(movie_id).await.ok().map(|v| v["results"].as_array().map_or(0, Vec::len)),
    );
    report("similar", tmdb.similar(movie_id, 1).await.ok().map(|p| p.results.len()));
    report(
        "recommendations",
        tmdb.recommendations(movie_id, 1).await.ok().map(|p| p.results.len()),
    );
    report(
        "trending (week)",
        tmdb.trending(TimeWindow::Week, 1).await.ok().map(|p| p.results.len()),
    );
    report(
        "action by rating",
        tmdb.movies_by_genre(&[28], 1, SortBy::VoteAverageDesc)
            .await
            .ok()
            .map(|p| p.results.len()),
    );
    Ok(())
}
