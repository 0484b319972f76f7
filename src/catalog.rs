use std::collections::{HashMap, HashSet};

use anyhow::anyhow;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;

use crate::{
    entities::{genre, movie, movie_genre},
    error::AppResult,
    models::{ImageBase, RemoteGenre, RemoteMovie},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Upsert {
    Created,
    Updated,
}

/// Local movie/genre tables.
#[derive(Clone)]
pub struct Catalog {
    db: DatabaseConnection,
}

pub struct MoviePage {
    pub items: Vec<movie::Model>,
    pub count: u64,
    pub pages: u64,
}

impl Catalog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn upsert_genre(&self, remote: &RemoteGenre) -> AppResult<Upsert> {
        let existing = genre::Entity::find()
            .filter(genre::Column::TmdbId.eq(remote.id))
            .one(&self.db)
            .await?;

        match existing {
            Some(row) => {
                let mut model: genre::ActiveModel = row.into();
                model.name = Set(remote.name.clone());
                model.update(&self.db).await?;
                Ok(Upsert::Updated)
            },
            None => {
                genre::ActiveModel {
                    tmdb_id: Set(remote.id),
                    name: Set(remote.name.clone()),
                    ..Default::default()
                }
                .insert(&self.db)
                .await?;
                Ok(Upsert::Created)
            },
        }
    }

    /// Overwrites every scalar field the vendor supplies. `runtime` is not part of
    /// list payloads and is left as is.
    pub async fn upsert_movie(&self, remote: &RemoteMovie) -> AppResult<(movie::Model, Upsert)> {
        let vote_average = remote.vote_average.map(normalize_rating).transpose()?;
        let vote_count = i32::try_from(remote.vote_count.unwrap_or_default())
            .ok()
            .filter(|n| *n >= 0)
            .ok_or_else(|| anyhow!("invalid vote_count {:?}", remote.vote_count))?;
        let release_date = remote.parsed_release_date().map(|d| d.to_string());
        let now = now_sec();

        let (mut model, outcome) = match self.movie_by_tmdb_id(remote.id).await? {
            Some(row) => (movie::ActiveModel::from(row), Upsert::Updated),
            None => (
                movie::ActiveModel { created_at: Set(now), ..Default::default() },
                Upsert::Created,
            ),
        };

        model.tmdb_id = Set(remote.id);
        model.title = Set(remote.title.clone().unwrap_or_default());
        model.original_title = Set(remote.original_title.clone().unwrap_or_default());
        model.overview = Set(remote.overview.clone().unwrap_or_default());
        model.release_date = Set(release_date);
        model.vote_average = Set(vote_average);
        model.vote_count = Set(vote_count);
        model.popularity = Set(remote.popularity);
        model.poster_path = Set(remote.poster_path.clone().unwrap_or_default());
        model.backdrop_path = Set(remote.backdrop_path.clone().unwrap_or_default());
        model.adult = Set(remote.adult.unwrap_or_default());
        model.video = Set(remote.video.unwrap_or_default());
        model.original_language = Set(remote.original_language.clone().unwrap_or_default());
        model.updated_at = Set(now);

        let saved = match outcome {
            Upsert::Created => model.insert(&self.db).await?,
            Upsert::Updated => model.update(&self.db).await?,
        };
        Ok((saved, outcome))
    }

    /// Drops every link of `movie_id` and links it to the given TMDb genre ids.
    /// Returns the ids that have no local genre row.
    pub async fn replace_movie_genres(
        &self,
        movie_id: i32,
        genre_tmdb_ids: &[i32],
    ) -> AppResult<Vec<i32>> {
        let txn = self.db.begin().await?;

        movie_genre::Entity::delete_many()
            .filter(movie_genre::Column::MovieId.eq(movie_id))
            .exec(&txn)
            .await?;

        let mut seen = HashSet::new();
        let mut missing = Vec::new();
        for &tmdb_id in genre_tmdb_ids {
            if !seen.insert(tmdb_id) {
                continue;
            }
            let Some(genre) =
                genre::Entity::find().filter(genre::Column::TmdbId.eq(tmdb_id)).one(&txn).await?
            else {
                missing.push(tmdb_id);
                continue;
            };
            movie_genre::ActiveModel {
                movie_id: Set(movie_id),
                genre_id: Set(genre.id),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        Ok(missing)
    }

    pub async fn list_movies(&self, page: u64, page_size: u64) -> AppResult<MoviePage> {
        let paginator = movie::Entity::find()
            .order_by_desc(movie::Column::Popularity)
            .order_by_desc(movie::Column::VoteAverage)
            .order_by_asc(movie::Column::Id)
            .paginate(&self.db, page_size);
        let totals = paginator.num_items_and_pages().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok(MoviePage { items, count: totals.number_of_items, pages: totals.number_of_pages })
    }

    pub async fn movie(&self, id: i32) -> AppResult<Option<movie::Model>> {
        Ok(movie::Entity::find_by_id(id).one(&self.db).await?)
    }

    pub async fn movie_by_tmdb_id(&self, tmdb_id: i32) -> AppResult<Option<movie::Model>> {
        Ok(movie::Entity::find()
            .filter(movie::Column::TmdbId.eq(tmdb_id))
            .one(&self.db)
            .await?)
    }

    pub async fn genres(&self) -> AppResult<Vec<genre::Model>> {
        Ok(genre::Entity::find()
            .order_by_asc(genre::Column::Name)
            .order_by_asc(genre::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn genres_by_movie(
        &self,
        movie_ids: &[i32],
    ) -> AppResult<HashMap<i32, Vec<genre::Model>>> {
        let rows = movie_genre::Entity::find()
            .filter(movie_genre::Column::MovieId.is_in(movie_ids.iter().copied()))
            .order_by_asc(movie_genre::Column::Id)
            .find_also_related(genre::Entity)
            .all(&self.db)
            .await?;

        let mut out: HashMap<i32, Vec<genre::Model>> = HashMap::new();
        for (link, genre) in rows {
            if let Some(genre) = genre {
                out.entry(link.movie_id).or_default().push(genre);
            }
        }
        Ok(out)
    }

    /// Local rows rendered with their genres, in input order.
    pub async fn movie_views(
        &self,
        movies: Vec<movie::Model>,
        images: &ImageBase,
    ) -> AppResult<Vec<MovieView>> {
        let ids: Vec<i32> = movies.iter().map(|m| m.id).collect();
        let mut genres = self.genres_by_movie(&ids).await?;
        Ok(movies
            .into_iter()
            .map(|m| {
                let linked = genres.remove(&m.id).unwrap_or_default();
                MovieView::new(m, linked, images)
            })
            .collect())
    }
}

fn normalize_rating(value: f64) -> AppResult<f64> {
    if !(0.0..=10.0).contains(&value) {
        return Err(anyhow!("vote_average {value} outside [0, 10]").into());
    }
    Ok((value * 10.0).round() / 10.0)
}

pub(crate) fn now_sec() -> i64 {
    jiff::Timestamp::now().as_second()
}

pub(crate) fn format_timestamp(secs: i64) -> String {
    jiff::Timestamp::from_second(secs).map(|ts| ts.to_string()).unwrap_or_default()
}

#[derive(Clone, Debug, Serialize)]
pub struct GenreRef {
    pub id: i32,
    pub name: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct GenreView {
    pub id: i32,
    pub tmdb_id: i32,
    pub name: String,
}

impl From<genre::Model> for GenreView {
    fn from(g: genre::Model) -> Self {
        Self { id: g.id, tmdb_id: g.tmdb_id, name: g.name }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MovieView {
    pub id: i32,
    pub tmdb_id: i32,
    pub title: String,
    pub original_title: String,
    pub overview: String,
    pub release_date: Option<String>,
    pub runtime: Option<i32>,
    pub vote_average: Option<f64>,
    pub vote_count: i32,
    pub popularity: Option<f64>,
    pub poster_path: String,
    pub backdrop_path: String,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub adult: bool,
    pub video: bool,
    pub original_language: String,
    pub genres: Vec<GenreRef>,
    pub created_at: String,
    pub updated_at: String,
}

impl MovieView {
    pub fn new(m: movie::Model, genres: Vec<genre::Model>, images: &ImageBase) -> Self {
        Self {
            id: m.id,
            tmdb_id: m.tmdb_id,
            poster_url: images.poster(Some(&m.poster_path)),
            backdrop_url: images.backdrop(Some(&m.backdrop_path)),
            title: m.title,
            original_title: m.original_title,
            overview: m.overview,
            release_date: m.release_date,
            runtime: m.runtime,
            vote_average: m.vote_average,
            vote_count: m.vote_count,
            popularity: m.popularity,
            poster_path: m.poster_path,
            backdrop_path: m.backdrop_path,
            adult: m.adult,
            video: m.video,
            original_language: m.original_language,
            genres: genres.into_iter().map(|g| GenreRef { id: g.id, name: g.name }).collect(),
            created_at: format_timestamp(m.created_at),
            updated_at: format_timestamp(m.updated_at),
        }
    }
}
