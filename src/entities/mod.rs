pub mod auth_token;
pub mod genre;
pub mod movie;
pub mod movie_genre;
pub mod user;
pub mod user_favorite;
pub mod user_watchlist;
