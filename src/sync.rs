//! Mirrors TMDb genres and popular movies into the local catalog.
//!
//! Genre sync must run before movie sync: links to genres that are not yet
//! stored locally are skipped with a warning.

use std::fmt;

use tracing::{debug, error, info, warn};

use crate::{
    catalog::{Catalog, Upsert},
    error::{AppError, AppResult},
    models::RemoteMovie,
    tmdb::TmdbClient,
};

pub const DEFAULT_MOVIE_PAGES: u32 = 5;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SyncReport {
    pub created: u32,
    pub updated: u32,
    pub failed: u32,
    pub skipped_pages: u32,
}

impl SyncReport {
    fn record(&mut self, outcome: Upsert) {
        match outcome {
            Upsert::Created => self.created += 1,
            Upsert::Updated => self.updated += 1,
        }
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} created, {} updated", self.created, self.updated)?;
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        if self.skipped_pages > 0 {
            write!(f, ", {} pages skipped", self.skipped_pages)?;
        }
        Ok(())
    }
}

pub async fn sync_genres(tmdb: &TmdbClient, catalog: &Catalog) -> AppResult<SyncReport> {
    info!("fetching genres from tmdb");
    let list = tmdb
        .genres()
        .await
        .map_err(|_| AppError::unavailable("Failed to fetch genres from TMDb API"))?;

    let mut report = SyncReport::default();
    for genre in &list.genres {
        let outcome = catalog.upsert_genre(genre).await?;
        debug!(tmdb_id = genre.id, name = %genre.name, ?outcome, "synced genre");
        report.record(outcome);
    }

    info!(%report, "synced genres");
    Ok(report)
}

pub async fn sync_popular_movies(
    tmdb: &TmdbClient,
    catalog: &Catalog,
    pages: u32,
) -> AppResult<SyncReport> {
    info!(pages, "fetching popular movies from tmdb");
    let mut report = SyncReport::default();

    for page in 1..=pages {
        let Ok(data) = tmdb.popular(page).await else {
            warn!(page, "failed to fetch page, skipping");
            report.skipped_pages += 1;
            continue;
        };

        for item in data.movies() {
            let result = match item {
                Ok(movie) => sync_movie(catalog, &movie).await,
                Err(err) => Err(anyhow::Error::new(err).into()),
            };
            match result {
                Ok(outcome) => report.record(outcome),
                Err(err) => {
                    error!(page, error = %err, "failed to sync movie");
                    report.failed += 1;
                },
            }
        }
    }

    info!(%report, "synced movies");
    Ok(report)
}

async fn sync_movie(catalog: &Catalog, remote: &RemoteMovie) -> AppResult<Upsert> {
    let (movie, outcome) = catalog.upsert_movie(remote).await?;
    debug!(tmdb_id = movie.tmdb_id, title = %movie.title, ?outcome, "synced movie");

    if let Some(genre_ids) = remote.genre_ids.as_deref().filter(|ids| !ids.is_empty()) {
        let missing = catalog.replace_movie_genres(movie.id, genre_ids).await?;
        for genre_id in missing {
            warn!(
                tmdb_id = movie.tmdb_id,
                genre_id, "genre not found locally, run sync-genres first"
            );
        }
    }

    Ok(outcome)
}
