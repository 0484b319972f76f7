use std::{fmt, str::FromStr};

use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One movie as it appears in any TMDb list endpoint.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct RemoteMovie {
    pub id: i32,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub overview: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<i64>,
    pub popularity: Option<f64>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub adult: Option<bool>,
    pub video: Option<bool>,
    pub original_language: Option<String>,
    pub genre_ids: Option<Vec<i32>>,
}

impl RemoteMovie {
    /// `None` for absent, empty or malformed dates.
    pub fn parsed_release_date(&self) -> Option<Date> {
        parse_release_date(self.release_date.as_deref())
    }
}

pub fn parse_release_date(raw: Option<&str>) -> Option<Date> {
    let raw = raw?.trim();
    if raw.len() != 10 {
        return None;
    }
    raw.parse().ok()
}

/// The `/movie/{id}` payload: list fields plus detail-only fields.
#[derive(Clone, Debug, Deserialize)]
pub struct RemoteMovieDetail {
    #[serde(flatten)]
    pub movie: RemoteMovie,
    pub runtime: Option<i32>,
    pub budget: Option<i64>,
    pub revenue: Option<i64>,
    pub tagline: Option<String>,
    pub homepage: Option<String>,
    pub imdb_id: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub genres: Vec<Value>,
    #[serde(default)]
    pub production_companies: Vec<Value>,
    #[serde(default)]
    pub production_countries: Vec<Value>,
    #[serde(default)]
    pub spoken_languages: Vec<Value>,
}

/// Vendor page envelope. Items stay raw so one bad record does not sink the page.
#[derive(Clone, Debug, Deserialize)]
pub struct RemotePage {
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "first_page")]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u64,
}

fn first_page() -> u32 {
    1
}

impl RemotePage {
    pub fn movies(&self) -> impl Iterator<Item = Result<RemoteMovie, serde_json::Error>> + '_ {
        self.results.iter().map(|v| RemoteMovie::deserialize(v))
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct RemoteGenre {
    pub id: i32,
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GenreList {
    #[serde(default)]
    pub genres: Vec<RemoteGenre>,
}

/// Builds absolute image URLs from the relative fragments TMDb returns.
#[derive(Clone, Debug)]
pub struct ImageBase(String);

impl ImageBase {
    pub fn new(base: impl Into<String>) -> Self {
        Self(base.into().trim_end_matches('/').to_string())
    }

    pub fn poster(&self, path: Option<&str>) -> Option<String> {
        self.url("w500", path)
    }

    pub fn backdrop(&self, path: Option<&str>) -> Option<String> {
        self.url("w1280", path)
    }

    fn url(&self, size: &str, path: Option<&str>) -> Option<String> {
        let path = path.filter(|p| !p.is_empty())?;
        Some(format!("{}/{size}{path}", self.0))
    }
}

/// Normalized item shape shared by every proxy list endpoint.
#[derive(Clone, Debug, Serialize)]
pub struct MovieItem {
    pub id: i32,
    pub title: String,
    pub original_title: String,
    pub overview: String,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    pub vote_count: i64,
    pub popularity: Option<f64>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub adult: bool,
    pub video: bool,
    pub original_language: String,
    pub genre_ids: Vec<i32>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
}

impl MovieItem {
    pub fn project(movie: RemoteMovie, images: &ImageBase) -> Self {
        let release_date = movie.parsed_release_date().map(|d| d.to_string());
        let poster_url = images.poster(movie.poster_path.as_deref());
        let backdrop_url = images.backdrop(movie.backdrop_path.as_deref());
        Self {
            id: movie.id,
            title: movie.title.unwrap_or_default(),
            original_title: movie.original_title.unwrap_or_default(),
            overview: movie.overview.unwrap_or_default(),
            release_date,
            vote_average: movie.vote_average,
            vote_count: movie.vote_count.unwrap_or_default(),
            popularity: movie.popularity,
            poster_path: movie.poster_path,
            backdrop_path: movie.backdrop_path,
            adult: movie.adult.unwrap_or_default(),
            video: movie.video.unwrap_or_default(),
            original_language: movie.original_language.unwrap_or_default(),
            genre_ids: movie.genre_ids.unwrap_or_default(),
            poster_url,
            backdrop_url,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MovieDetailItem {
    #[serde(flatten)]
    pub item: MovieItem,
    pub runtime: Option<i32>,
    pub budget: Option<i64>,
    pub revenue: Option<i64>,
    pub tagline: String,
    pub homepage: String,
    pub imdb_id: String,
    pub status: String,
    pub genres: Vec<Value>,
    pub production_companies: Vec<Value>,
    pub production_countries: Vec<Value>,
    pub spoken_languages: Vec<Value>,
}

impl MovieDetailItem {
    pub fn project(detail: RemoteMovieDetail, images: &ImageBase) -> Self {
        Self {
            item: MovieItem::project(detail.movie, images),
            runtime: detail.runtime,
            budget: detail.budget,
            revenue: detail.revenue,
            tagline: detail.tagline.unwrap_or_default(),
            homepage: detail.homepage.unwrap_or_default(),
            imdb_id: detail.imdb_id.unwrap_or_default(),
            status: detail.status.unwrap_or_default(),
            genres: detail.genres,
            production_companies: detail.production_companies,
            production_countries: detail.production_countries,
            spoken_languages: detail.spoken_languages,
        }
    }
}

/// `{results, page, total_pages, total_results}` regardless of the vendor endpoint.
#[derive(Clone, Debug, Serialize)]
pub struct Envelope {
    pub results: Vec<MovieItem>,
    pub page: u32,
    pub total_pages: u32,
    pub total_results: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl Envelope {
    pub fn from_page(page: RemotePage, images: &ImageBase) -> Self {
        let results = page
            .movies()
            .filter_map(|item| match item {
                Ok(movie) => Some(MovieItem::project(movie, images)),
                Err(err) => {
                    tracing::warn!(error = %err, "dropping undecodable tmdb result");
                    None
                },
            })
            .collect();
        Self {
            results,
            page: page.page,
            total_pages: page.total_pages,
            total_results: page.total_results,
            query: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum SortBy {
    #[default]
    PopularityDesc,
    VoteAverageDesc,
    ReleaseDateDesc,
    RevenueDesc,
}

impl SortBy {
    pub const ALL: [SortBy; 4] =
        [SortBy::PopularityDesc, SortBy::VoteAverageDesc, SortBy::ReleaseDateDesc, SortBy::RevenueDesc];

    pub fn as_str(self) -> &'static str {
        match self {
            SortBy::PopularityDesc => "popularity.desc",
            SortBy::VoteAverageDesc => "vote_average.desc",
            SortBy::ReleaseDateDesc => "release_date.desc",
            SortBy::RevenueDesc => "revenue.desc",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("sort_by must be one of: popularity.desc, vote_average.desc, release_date.desc, revenue.desc")]
pub struct InvalidSortBy;

impl FromStr for SortBy {
    type Err = InvalidSortBy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortBy::ALL.into_iter().find(|v| v.as_str() == s).ok_or(InvalidSortBy)
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TimeWindow {
    #[default]
    Day,
    Week,
}

impl TimeWindow {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "day" => Some(TimeWindow::Day),
            "week" => Some(TimeWindow::Week),
            _ => None,
        }
    }
}

/// Filters for `/discover/movie`. Only populated fields are sent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DiscoverQuery {
    pub with_genres: Option<String>,
    pub sort_by: Option<SortBy>,
    pub vote_count_gte: Option<u32>,
    pub vote_average_gte: Option<f64>,
    pub primary_release_year: Option<i32>,
    pub page: Option<u32>,
    /// Forwarded verbatim.
    pub extra: Vec<(String, String)>,
}

impl DiscoverQuery {
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(genres) = &self.with_genres {
            params.push(("with_genres".to_string(), genres.clone()));
        }
        if let Some(sort_by) = self.sort_by {
            params.push(("sort_by".to_string(), sort_by.to_string()));
        }
        if let Some(n) = self.vote_count_gte {
            params.push(("vote_count.gte".to_string(), n.to_string()));
        }
        if let Some(avg) = self.vote_average_gte {
            params.push(("vote_average.gte".to_string(), avg.to_string()));
        }
        if let Some(year) = self.primary_release_year {
            params.push(("primary_release_year".to_string(), year.to_string()));
        }
        if let Some(page) = self.page {
            params.push(("page".to_string(), page.to_string()));
        }
        params.extend(self.extra.iter().cloned());
        params
    }
}
