use axum::http::StatusCode;
use serde_json::json;

use super::fixtures::{Harness, IMAGE_BASE, TEST_TOKEN, movie_json};

#[tokio::test]
async fn health_does_not_need_tmdb() {
    let h = Harness::without_tmdb().await;
    let (status, body) = h.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = h.get("/api").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoints"]["health"], "/api/health");
}

#[tokio::test]
async fn popular_returns_the_normalized_envelope() {
    let h = Harness::new().await;
    h.fake.set_popular(2, 7, vec![movie_json(550, "Fight Club", &[18])]);

    let (status, body) = h.get("/api/tmdb/popular?page=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 2);
    assert_eq!(body["total_pages"], 7);
    assert_eq!(body["total_results"], 7);
    assert!(body.get("query").is_none());

    let item = &body["results"][0];
    assert_eq!(item["id"], 550);
    assert_eq!(item["title"], "Fight Club");
    assert_eq!(item["genre_ids"], json!([18]));
    assert_eq!(item["poster_url"], format!("{IMAGE_BASE}/w500/poster550.jpg"));
    assert_eq!(item["backdrop_url"], format!("{IMAGE_BASE}/w1280/backdrop550.jpg"));

    let sent = h.fake.last_request();
    assert_eq!(sent.path, "movie/popular");
    assert_eq!(sent.query["page"], "2");
    assert_eq!(sent.authorization.as_deref(), Some(format!("Bearer {TEST_TOKEN}").as_str()));
}

#[tokio::test]
async fn missing_images_project_to_null_urls() {
    let h = Harness::new().await;
    let mut movie = movie_json(1, "Lost Poster", &[]);
    movie["poster_path"] = json!(null);
    movie["backdrop_path"] = json!("");
    h.fake.set_lists(vec![movie]);

    let (status, body) = h.get("/api/tmdb/top-rated").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["results"][0]["poster_url"].is_null());
    assert!(body["results"][0]["backdrop_url"].is_null());
}

#[tokio::test]
async fn invalid_page_numbers_are_rejected_before_calling_tmdb() {
    let h = Harness::new().await;
    for uri in [
        "/api/tmdb/popular?page=0",
        "/api/tmdb/upcoming?page=abc",
        "/api/tmdb/now-playing?page=-1",
    ] {
        let (status, body) = h.get(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], "Invalid page number");
    }
    assert!(h.fake.requests().is_empty());
}

#[tokio::test]
async fn upstream_failures_map_to_service_unavailable() {
    let h = Harness::new().await;
    for uri in [
        "/api/tmdb/popular",
        "/api/tmdb/top-rated",
        "/api/tmdb/now-playing",
        "/api/tmdb/upcoming",
        "/api/tmdb/genres",
        "/api/recommendations/trending",
    ] {
        let (status, body) = h.get(uri).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{uri}");
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn missing_credentials_surface_as_a_configuration_error() {
    let h = Harness::without_tmdb().await;
    let (status, body) = h.get("/api/tmdb/popular").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().starts_with("TMDb API configuration error"));

    let (status, _) = h.get("/api/movies").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn search_requires_a_query_and_echoes_it() {
    let h = Harness::new().await;
    let (status, _) = h.get("/api/tmdb/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = h.get("/api/tmdb/search?q=%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(h.fake.requests().is_empty());

    h.fake.set_lists(vec![movie_json(268, "Batman", &[])]);
    let (status, body) = h.get("/api/tmdb/search?q=batman&page=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["query"], "batman");
    assert_eq!(body["results"][0]["title"], "Batman");

    let sent = h.fake.last_request();
    assert_eq!(sent.path, "search/movie");
    assert_eq!(sent.query["query"], "batman");
    assert_eq!(sent.query["page"], "2");
}

#[tokio::test]
async fn movie_detail_passes_through_detail_fields() {
    let h = Harness::new().await;
    let mut detail = movie_json(550, "Fight Club", &[]);
    detail["runtime"] = json!(139);
    detail["tagline"] = json!("Mischief. Mayhem. Soap.");
    detail["genres"] = json!([{ "id": 18, "name": "Drama" }]);
    h.fake.set_detail(550, detail);

    let (status, body) = h.get("/api/tmdb/movie/550").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["runtime"], 139);
    assert_eq!(body["tagline"], "Mischief. Mayhem. Soap.");
    assert_eq!(body["genres"][0]["name"], "Drama");
    assert_eq!(body["poster_url"], format!("{IMAGE_BASE}/w500/poster550.jpg"));

    let (status, body) = h.get("/api/tmdb/movie/999999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Movie not found");
}

#[tokio::test]
async fn malformed_ids_are_json_bad_requests() {
    let h = Harness::new().await;
    for uri in [
        "/api/tmdb/movie/abc",
        "/api/tmdb/movie/99999999999",
        "/api/recommendations/similar/abc",
        "/api/recommendations/based-on/1.5",
        "/api/movies/abc",
    ] {
        let (status, body) = h.get(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].is_string(), "{uri}: {body}");
    }
    assert!(h.fake.requests().is_empty());
}

#[tokio::test]
async fn genres_are_proxied_verbatim() {
    let h = Harness::new().await;
    h.fake.set_genres(&[(28, "Action"), (12, "Adventure")]);

    let (status, body) = h.get("/api/tmdb/genres").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["genres"],
        json!([{ "id": 28, "name": "Action" }, { "id": 12, "name": "Adventure" }])
    );
}

#[tokio::test]
async fn similar_and_recommendations_report_not_found_on_failure() {
    let h = Harness::new().await;
    let (status, _) = h.get("/api/recommendations/similar/550").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = h.get("/api/recommendations/based-on/550").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    h.fake.set_lists(vec![movie_json(807, "Se7en", &[80])]);
    let (status, body) = h.get("/api/recommendations/similar/550?page=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"][0]["id"], 807);
    let sent = h.fake.last_request();
    assert_eq!(sent.path, "movie/550/similar");
    assert_eq!(sent.query["page"], "3");

    let (status, _) = h.get("/api/recommendations/based-on/550").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.fake.last_request().path, "movie/550/recommendations");
}

#[tokio::test]
async fn trending_defaults_to_the_daily_window() {
    let h = Harness::new().await;
    h.fake.set_lists(vec![movie_json(1, "Hot", &[])]);

    let (status, _) = h.get("/api/recommendations/trending").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.fake.last_request().path, "trending/movie/day");

    let (status, _) = h.get("/api/recommendations/trending?time_window=week").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.fake.last_request().path, "trending/movie/week");

    let (status, _) = h.get("/api/recommendations/trending?time_window=month").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn by_genre_forwards_the_discovery_filters() {
    let h = Harness::new().await;
    h.fake.set_lists(vec![movie_json(155, "The Dark Knight", &[28, 12])]);

    let (status, body) = h
        .get("/api/recommendations/by-genre?genres=28,12&sort_by=vote_average.desc&page=1")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["page"], 1);
    assert_eq!(body["results"][0]["title"], "The Dark Knight");

    let sent = h.fake.last_request();
    assert_eq!(sent.path, "discover/movie");
    assert_eq!(sent.query["with_genres"], "28,12");
    assert_eq!(sent.query["sort_by"], "vote_average.desc");
    assert_eq!(sent.query["vote_count.gte"], "50");
    assert_eq!(sent.query["page"], "1");
}

#[tokio::test]
async fn by_genre_validates_its_parameters() {
    let h = Harness::new().await;
    for uri in [
        "/api/recommendations/by-genre",
        "/api/recommendations/by-genre?genres=",
        "/api/recommendations/by-genre?genres=28,action",
        "/api/recommendations/by-genre?genres=28&page=0",
        "/api/recommendations/by-genre?genres=28&sort_by=title.asc",
    ] {
        let (status, _) = h.get(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    }
    assert!(h.fake.requests().is_empty());
}

#[tokio::test]
async fn discover_sends_defaults_and_only_supplied_filters() {
    let h = Harness::new().await;
    h.fake.set_lists(vec![movie_json(1, "Anything", &[])]);

    let (status, _) = h.get("/api/recommendations/discover").await;
    assert_eq!(status, StatusCode::OK);
    let sent = h.fake.last_request();
    let mut keys: Vec<&str> = sent.query.keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(keys, vec!["page", "sort_by", "vote_count.gte"]);
    assert_eq!(sent.query["sort_by"], "popularity.desc");
    assert_eq!(sent.query["vote_count.gte"], "50");

    let uri = "/api/recommendations/discover?with_genres=18&primary_release_year=1999\
               &vote_average_gte=7.5&vote_count_gte=1000";
    let (status, _) = h.get(uri).await;
    assert_eq!(status, StatusCode::OK);
    let sent = h.fake.last_request();
    assert_eq!(sent.query["with_genres"], "18");
    assert_eq!(sent.query["primary_release_year"], "1999");
    assert_eq!(sent.query["vote_average.gte"], "7.5");
    assert_eq!(sent.query["vote_count.gte"], "1000");

    let (status, _) = h.get("/api/recommendations/discover?primary_release_year=soon").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
