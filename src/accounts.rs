//! Users, opaque token pairs and per-user movie collections.

use anyhow::anyhow;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use serde::{Deserialize, Serialize};

use crate::{
    catalog::{format_timestamp, now_sec},
    entities::{auth_token, movie, user, user_favorite, user_watchlist},
    error::{AppError, AppResult},
};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// A per-user list of movies.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Collection {
    Favorites,
    Watchlist,
}

impl Collection {
    fn label(self) -> &'static str {
        match self {
            Collection::Favorites => "favorites",
            Collection::Watchlist => "watchlist",
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Registration {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub password: String,
    pub password_confirm: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct UserView {
    pub id: i32,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub date_joined: String,
    pub is_active: bool,
}

impl From<user::Model> for UserView {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            email: u.email,
            username: u.username,
            first_name: u.first_name,
            last_name: u.last_name,
            date_joined: format_timestamp(u.date_joined),
            is_active: u.is_active,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// One row of a favorites or watchlist collection, joined with its movie.
#[derive(Clone, Debug)]
pub struct CollectionEntry {
    pub id: i32,
    pub movie: movie::Model,
    pub created_at: i64,
}

#[derive(Clone)]
pub struct Accounts {
    db: DatabaseConnection,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl Accounts {
    pub fn new(db: DatabaseConnection, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        Self { db, access_ttl_secs, refresh_ttl_secs }
    }

    pub async fn register(&self, reg: Registration) -> AppResult<user::Model> {
        let email = reg.email.trim().to_lowercase();
        let username = reg.username.trim().to_string();

        if !is_plausible_email(&email) {
            return Err(AppError::bad_request("Enter a valid email address."));
        }
        if username.is_empty() {
            return Err(AppError::bad_request("username is required"));
        }
        if reg.password != reg.password_confirm {
            return Err(AppError::bad_request("Passwords do not match."));
        }
        validate_password(&reg.password)?;
        self.ensure_unique(&email, &username, None).await?;

        let password_hash = hash_password(&reg.password)?;
        let created = user::ActiveModel {
            email: Set(email),
            username: Set(username),
            first_name: Set(reg.first_name.trim().to_string()),
            last_name: Set(reg.last_name.trim().to_string()),
            password_hash: Set(password_hash),
            is_active: Set(true),
            date_joined: Set(now_sec()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        tracing::info!(user_id = created.id, "registered user");
        Ok(created)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<user::Model> {
        let invalid = || AppError::unauthorized("Invalid email or password.");
        let user = user::Entity::find()
            .filter(user::Column::Email.eq(email.trim().to_lowercase()))
            .one(&self.db)
            .await?
            .ok_or_else(invalid)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(invalid());
        }
        if !user.is_active {
            return Err(AppError::unauthorized("User account is disabled."));
        }
        Ok(user)
    }

    pub async fn issue_tokens(&self, user_id: i32) -> AppResult<TokenPair> {
        Ok(TokenPair {
            access: self.issue(user_id, TokenKind::Access).await?,
            refresh: self.issue(user_id, TokenKind::Refresh).await?,
        })
    }

    /// Exchanges a live refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<String> {
        let user = self
            .user_for_token(refresh_token, TokenKind::Refresh)
            .await?
            .ok_or_else(|| AppError::unauthorized("Token is invalid or expired"))?;
        self.issue(user.id, TokenKind::Access).await
    }

    /// Resolves an access token to an active user.
    pub async fn user_for_access_token(&self, token: &str) -> AppResult<Option<user::Model>> {
        self.user_for_token(token, TokenKind::Access).await
    }

    pub async fn update_profile(
        &self,
        current: user::Model,
        update: ProfileUpdate,
    ) -> AppResult<user::Model> {
        let email = update.email.map(|e| e.trim().to_lowercase());
        let username = update.username.map(|u| u.trim().to_string());

        if email.as_deref().is_some_and(|e| !is_plausible_email(e)) {
            return Err(AppError::bad_request("Enter a valid email address."));
        }
        if username.as_deref() == Some("") {
            return Err(AppError::bad_request("username may not be blank"));
        }
        self.ensure_unique(
            email.as_deref().unwrap_or(&current.email),
            username.as_deref().unwrap_or(&current.username),
            Some(current.id),
        )
        .await?;

        let mut model: user::ActiveModel = current.into();
        if let Some(email) = email {
            model.email = Set(email);
        }
        if let Some(username) = username {
            model.username = Set(username);
        }
        if let Some(first_name) = update.first_name {
            model.first_name = Set(first_name.trim().to_string());
        }
        if let Some(last_name) = update.last_name {
            model.last_name = Set(last_name.trim().to_string());
        }
        Ok(model.update(&self.db).await?)
    }

    pub async fn list(&self, user_id: i32, which: Collection) -> AppResult<Vec<CollectionEntry>> {
        let rows: Vec<(i32, i64, Option<movie::Model>)> = match which {
            Collection::Favorites => user_favorite::Entity::find()
                .filter(user_favorite::Column::UserId.eq(user_id))
                .order_by_desc(user_favorite::Column::CreatedAt)
                .order_by_desc(user_favorite::Column::Id)
                .find_also_related(movie::Entity)
                .all(&self.db)
                .await?
                .into_iter()
                .map(|(row, movie)| (row.id, row.created_at, movie))
                .collect(),
            Collection::Watchlist => user_watchlist::Entity::find()
                .filter(user_watchlist::Column::UserId.eq(user_id))
                .order_by_desc(user_watchlist::Column::CreatedAt)
                .order_by_desc(user_watchlist::Column::Id)
                .find_also_related(movie::Entity)
                .all(&self.db)
                .await?
                .into_iter()
                .map(|(row, movie)| (row.id, row.created_at, movie))
                .collect(),
        };

        Ok(rows
            .into_iter()
            .filter_map(|(id, created_at, movie)| {
                movie.map(|movie| CollectionEntry { id, movie, created_at })
            })
            .collect())
    }

    /// Adds a local movie to a collection. Unknown movies and duplicates are client errors.
    pub async fn add(
        &self,
        user_id: i32,
        which: Collection,
        movie_id: i32,
    ) -> AppResult<CollectionEntry> {
        let movie = movie::Entity::find_by_id(movie_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::bad_request("movie_id: Movie not found."))?;

        if self.contains(user_id, which, movie_id).await? {
            return Err(already_listed(which));
        }

        let now = now_sec();
        let id = self.insert_entry(user_id, which, movie_id, now).await?;
        Ok(CollectionEntry { id, movie, created_at: now })
    }

    /// A concurrent duplicate that slips past `contains` trips the unique index and is
    /// reported the same way.
    async fn insert_entry(
        &self,
        user_id: i32,
        which: Collection,
        movie_id: i32,
        now: i64,
    ) -> AppResult<i32> {
        let inserted = match which {
            Collection::Favorites => user_favorite::ActiveModel {
                user_id: Set(user_id),
                movie_id: Set(movie_id),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&self.db)
            .await
            .map(|row| row.id),
            Collection::Watchlist => user_watchlist::ActiveModel {
                user_id: Set(user_id),
                movie_id: Set(movie_id),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&self.db)
            .await
            .map(|row| row.id),
        };

        inserted.map_err(|err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => already_listed(which),
            _ => err.into(),
        })
    }

    /// Deletes an entry by its row id; only the owner's rows are visible.
    pub async fn remove(&self, user_id: i32, which: Collection, entry_id: i32) -> AppResult<()> {
        let not_found = || AppError::not_found("No entry matches the given query.");
        match which {
            Collection::Favorites => {
                let row = user_favorite::Entity::find_by_id(entry_id)
                    .filter(user_favorite::Column::UserId.eq(user_id))
                    .one(&self.db)
                    .await?
                    .ok_or_else(not_found)?;
                row.delete(&self.db).await?;
            },
            Collection::Watchlist => {
                let row = user_watchlist::Entity::find_by_id(entry_id)
                    .filter(user_watchlist::Column::UserId.eq(user_id))
                    .one(&self.db)
                    .await?
                    .ok_or_else(not_found)?;
                row.delete(&self.db).await?;
            },
        }
        Ok(())
    }

    pub async fn contains(&self, user_id: i32, which: Collection, movie_id: i32) -> AppResult<bool> {
        let count = match which {
            Collection::Favorites => {
                user_favorite::Entity::find()
                    .filter(user_favorite::Column::UserId.eq(user_id))
                    .filter(user_favorite::Column::MovieId.eq(movie_id))
                    .count(&self.db)
                    .await?
            },
            Collection::Watchlist => {
                user_watchlist::Entity::find()
                    .filter(user_watchlist::Column::UserId.eq(user_id))
                    .filter(user_watchlist::Column::MovieId.eq(movie_id))
                    .count(&self.db)
                    .await?
            },
        };
        Ok(count > 0)
    }

    async fn issue(&self, user_id: i32, kind: TokenKind) -> AppResult<String> {
        let now = now_sec();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
        };
        let token = uuid::Uuid::new_v4().simple().to_string();
        auth_token::ActiveModel {
            token: Set(token.clone()),
            user_id: Set(user_id),
            kind: Set(kind.as_str().to_string()),
            expires_at: Set(now + ttl),
            created_at: Set(now),
        }
        .insert(&self.db)
        .await?;
        Ok(token)
    }

    async fn user_for_token(&self, token: &str, kind: TokenKind) -> AppResult<Option<user::Model>> {
        let found = auth_token::Entity::find_by_id(token.to_string())
            .filter(auth_token::Column::Kind.eq(kind.as_str()))
            .filter(auth_token::Column::ExpiresAt.gt(now_sec()))
            .find_also_related(user::Entity)
            .one(&self.db)
            .await?;
        Ok(found.and_then(|(_, user)| user).filter(|u| u.is_active))
    }

    async fn ensure_unique(
        &self,
        email: &str,
        username: &str,
        except_user: Option<i32>,
    ) -> AppResult<()> {
        let mut by_email = user::Entity::find().filter(user::Column::Email.eq(email));
        let mut by_username = user::Entity::find().filter(user::Column::Username.eq(username));
        if let Some(id) = except_user {
            by_email = by_email.filter(user::Column::Id.ne(id));
            by_username = by_username.filter(user::Column::Id.ne(id));
        }
        if by_email.count(&self.db).await? > 0 {
            return Err(AppError::bad_request("user with this email already exists."));
        }
        if by_username.count(&self.db).await? > 0 {
            return Err(AppError::bad_request("A user with that username already exists."));
        }
        Ok(())
    }
}

fn already_listed(which: Collection) -> AppError {
    AppError::bad_request(format!("Movie is already in {}.", which.label()))
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
                && !domain.ends_with('.') && !email.contains(char::is_whitespace)
        },
        None => false,
    }
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "This password is too short. It must contain at least {MIN_PASSWORD_LEN} characters."
        )));
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::bad_request("This password is entirely numeric."));
    }
    Ok(())
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("{err}"))?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, stored: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(stored).map_err(|err| anyhow!("{err}"))?;
    Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}
