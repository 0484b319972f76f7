use std::sync::Arc;

use serde_json::json;

use super::fixtures::{FakeTmdb, Harness, movie_json, spawn_fake_tmdb, tmdb_config};
use crate::{
    config::TmdbConfig,
    models::{DiscoverQuery, SortBy},
    tmdb::{TmdbClient, TmdbError},
};

#[tokio::test]
async fn api_key_is_sent_as_a_query_parameter() {
    let fake = Arc::new(FakeTmdb::default());
    let base_url = spawn_fake_tmdb(fake.clone()).await;
    let config = TmdbConfig {
        bearer_token: None,
        api_key: Some("v3-key".into()),
        ..tmdb_config(&base_url)
    };
    let client = TmdbClient::new(reqwest::Client::new(), &config).unwrap();
    fake.set_genres(&[(28, "Action")]);

    let list = client.genres().await.unwrap();
    assert_eq!(list.genres.len(), 1);

    let sent = fake.last_request();
    assert_eq!(sent.path, "genre/movie/list");
    assert_eq!(sent.query["api_key"], "v3-key");
    assert_eq!(sent.authorization, None);
}

#[tokio::test]
async fn connectivity_check_follows_the_genre_endpoint() {
    let h = Harness::new().await;
    assert!(!h.tmdb().test_connection().await);

    h.fake.set_genres(&[(28, "Action")]);
    assert!(h.tmdb().test_connection().await);
}

#[tokio::test]
async fn failures_are_typed() {
    let h = Harness::new().await;

    let err = h.tmdb().popular(1).await.unwrap_err();
    assert!(matches!(err, TmdbError::Status { status: 500, .. }), "{err}");
    assert!(!err.is_not_found());

    let err = h.tmdb().movie_details(1).await.unwrap_err();
    assert!(err.is_not_found(), "{err}");

    h.fake.set_detail(2, json!("not a movie"));
    let err = h.tmdb().movie_details(2).await.unwrap_err();
    assert!(matches!(err, TmdbError::Decode(_)), "{err}");
}

#[tokio::test]
async fn unreachable_host_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client =
        TmdbClient::new(reqwest::Client::new(), &tmdb_config(&format!("http://{addr}"))).unwrap();
    let err = client.genres().await.unwrap_err();
    assert!(matches!(err, TmdbError::Network(_)), "{err}");
}

#[tokio::test]
async fn detail_side_endpoints_hit_their_paths() {
    let h = Harness::new().await;
    h.fake.set_lists(vec![movie_json(1, "Any", &[])]);

    h.tmdb().credits(550).await.unwrap();
    assert_eq!(h.fake.last_request().path, "movie/550/credits");
    h.tmdb().videos(550).await.unwrap();
    assert_eq!(h.fake.last_request().path, "movie/550/videos");

    let page = h.tmdb().movies_by_genre(&[28], 2, SortBy::RevenueDesc).await.unwrap();
    assert_eq!(page.results.len(), 1);
    let sent = h.fake.last_request();
    assert_eq!(sent.path, "discover/movie");
    assert_eq!(sent.query["with_genres"], "28");
    assert_eq!(sent.query["sort_by"], "revenue.desc");
    assert_eq!(sent.query["vote_count.gte"], "50");
    assert_eq!(sent.query["page"], "2");
}

#[tokio::test]
async fn discover_forwards_extra_filters_verbatim() {
    let h = Harness::new().await;
    h.fake.set_lists(vec![movie_json(1, "Any", &[])]);

    let query = DiscoverQuery {
        page: Some(1),
        extra: vec![
            ("with_runtime.gte".into(), "90".into()),
            ("with_original_language".into(), "ko".into()),
        ],
        ..Default::default()
    };
    let page = h.tmdb().discover(&query).await.unwrap();
    assert_eq!(page.results.len(), 1);

    let sent = h.fake.last_request();
    assert_eq!(sent.path, "discover/movie");
    assert_eq!(sent.query["with_runtime.gte"], "90");
    assert_eq!(sent.query["with_original_language"], "ko");
    assert_eq!(sent.query["page"], "1");
    assert!(!sent.query.contains_key("sort_by"));
}
