use serde_json::json;

use super::fixtures::{Harness, movie_json};
use crate::{
    error::AppError,
    sync::{self, SyncReport},
};

async fn linked_genres(h: &Harness, tmdb_id: i32) -> Vec<i32> {
    let movie = h.catalog().movie_by_tmdb_id(tmdb_id).await.unwrap().unwrap();
    let mut ids: Vec<i32> = h
        .catalog()
        .genres_by_movie(&[movie.id])
        .await
        .unwrap()
        .remove(&movie.id)
        .unwrap_or_default()
        .into_iter()
        .map(|g| g.tmdb_id)
        .collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn genre_sync_is_idempotent() {
    let h = Harness::new().await;
    h.fake.set_genres(&[(28, "Action"), (12, "Adventure"), (18, "Drama")]);

    let first = sync::sync_genres(h.tmdb(), h.catalog()).await.unwrap();
    assert_eq!(first, SyncReport { created: 3, ..Default::default() });

    let second = sync::sync_genres(h.tmdb(), h.catalog()).await.unwrap();
    assert_eq!(second, SyncReport { updated: 3, ..Default::default() });
    assert_eq!(h.catalog().genres().await.unwrap().len(), 3);
}

#[tokio::test]
async fn genre_sync_overwrites_names() {
    let h = Harness::new().await;
    h.fake.set_genres(&[(878, "Sci-Fi")]);
    sync::sync_genres(h.tmdb(), h.catalog()).await.unwrap();

    h.fake.set_genres(&[(878, "Science Fiction")]);
    sync::sync_genres(h.tmdb(), h.catalog()).await.unwrap();

    let genres = h.catalog().genres().await.unwrap();
    assert_eq!(genres.len(), 1);
    assert_eq!(genres[0].tmdb_id, 878);
    assert_eq!(genres[0].name, "Science Fiction");
}

#[tokio::test]
async fn genre_sync_fails_when_the_list_is_unavailable() {
    let h = Harness::new().await;

    let err = sync::sync_genres(h.tmdb(), h.catalog()).await.unwrap_err();
    assert!(matches!(err, AppError::ServiceUnavailable(_)));
    assert!(h.catalog().genres().await.unwrap().is_empty());
}

#[tokio::test]
async fn movie_links_follow_the_latest_genre_list() {
    let h = Harness::new().await;
    h.fake.set_genres(&[(28, "Action"), (12, "Adventure"), (18, "Drama")]);
    sync::sync_genres(h.tmdb(), h.catalog()).await.unwrap();

    h.fake.set_popular(1, 1, vec![movie_json(550, "Fight Club", &[28, 12])]);
    let report = sync::sync_popular_movies(h.tmdb(), h.catalog(), 1).await.unwrap();
    assert_eq!(report, SyncReport { created: 1, ..Default::default() });
    assert_eq!(linked_genres(&h, 550).await, vec![12, 28]);

    h.fake.set_popular(1, 1, vec![movie_json(550, "Fight Club", &[18])]);
    let report = sync::sync_popular_movies(h.tmdb(), h.catalog(), 1).await.unwrap();
    assert_eq!(report, SyncReport { updated: 1, ..Default::default() });
    assert_eq!(linked_genres(&h, 550).await, vec![18]);
}

#[tokio::test]
async fn resync_keeps_one_row_per_movie_and_overwrites_fields() {
    let h = Harness::new().await;
    h.fake.set_popular(1, 1, vec![movie_json(550, "Fight Club", &[])]);
    sync::sync_popular_movies(h.tmdb(), h.catalog(), 1).await.unwrap();

    let mut changed = movie_json(550, "Fight Club (Remastered)", &[]);
    changed["vote_average"] = json!(7.46);
    h.fake.set_popular(1, 1, vec![changed]);
    sync::sync_popular_movies(h.tmdb(), h.catalog(), 1).await.unwrap();

    let page = h.catalog().list_movies(1, 20).await.unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.items[0].title, "Fight Club (Remastered)");
    assert_eq!(page.items[0].vote_average, Some(7.5));
}

#[tokio::test]
async fn missing_or_malformed_release_dates_are_stored_as_null() {
    let h = Harness::new().await;
    let mut no_date = movie_json(1, "No Date", &[]);
    no_date.as_object_mut().unwrap().remove("release_date");
    let mut empty = movie_json(2, "Empty Date", &[]);
    empty["release_date"] = json!("");
    let mut garbled = movie_json(3, "Garbled Date", &[]);
    garbled["release_date"] = json!("2021-13-45");
    h.fake.set_popular(1, 1, vec![no_date, empty, garbled]);

    let report = sync::sync_popular_movies(h.tmdb(), h.catalog(), 1).await.unwrap();
    assert_eq!(report, SyncReport { created: 3, ..Default::default() });

    for tmdb_id in [1, 2, 3] {
        let movie = h.catalog().movie_by_tmdb_id(tmdb_id).await.unwrap().unwrap();
        assert_eq!(movie.release_date, None, "tmdb id {tmdb_id}");
    }
}

#[tokio::test]
async fn a_failed_page_is_skipped_and_later_pages_still_sync() {
    let h = Harness::new().await;
    h.fake.set_popular(1, 3, vec![movie_json(1, "One", &[])]);
    h.fake.set_popular(3, 3, vec![movie_json(3, "Three", &[])]);

    let report = sync::sync_popular_movies(h.tmdb(), h.catalog(), 3).await.unwrap();
    assert_eq!(report, SyncReport { created: 2, skipped_pages: 1, ..Default::default() });

    let pages: Vec<String> = h
        .fake
        .requests()
        .into_iter()
        .filter(|r| r.path == "movie/popular")
        .filter_map(|r| r.query.get("page").cloned())
        .collect();
    assert_eq!(pages, vec!["1", "2", "3"]);
}

#[tokio::test]
async fn bad_items_are_counted_without_aborting_the_page() {
    let h = Harness::new().await;
    let mut out_of_range = movie_json(2, "Overrated", &[]);
    out_of_range["vote_average"] = json!(11.0);
    h.fake.set_popular(
        1,
        1,
        vec![
            movie_json(1, "Fine", &[]),
            out_of_range,
            json!({ "title": "No id" }),
            movie_json(3, "Also Fine", &[]),
        ],
    );

    let report = sync::sync_popular_movies(h.tmdb(), h.catalog(), 1).await.unwrap();
    assert_eq!(report, SyncReport { created: 2, failed: 2, ..Default::default() });
    assert!(h.catalog().movie_by_tmdb_id(2).await.unwrap().is_none());
}

#[tokio::test]
async fn unknown_genres_are_skipped() {
    let h = Harness::new().await;
    h.fake.set_genres(&[(28, "Action")]);
    sync::sync_genres(h.tmdb(), h.catalog()).await.unwrap();

    h.fake.set_popular(1, 1, vec![movie_json(550, "Fight Club", &[28, 9999, 28])]);
    let report = sync::sync_popular_movies(h.tmdb(), h.catalog(), 1).await.unwrap();
    assert_eq!(report.failed, 0);
    assert_eq!(linked_genres(&h, 550).await, vec![28]);
}

#[tokio::test]
async fn empty_genre_ids_leave_existing_links_alone() {
    let h = Harness::new().await;
    h.fake.set_genres(&[(28, "Action")]);
    sync::sync_genres(h.tmdb(), h.catalog()).await.unwrap();

    h.fake.set_popular(1, 1, vec![movie_json(550, "Fight Club", &[28])]);
    sync::sync_popular_movies(h.tmdb(), h.catalog(), 1).await.unwrap();

    h.fake.set_popular(1, 1, vec![movie_json(550, "Fight Club", &[])]);
    sync::sync_popular_movies(h.tmdb(), h.catalog(), 1).await.unwrap();
    assert_eq!(linked_genres(&h, 550).await, vec![28]);
}
