//! Postgres-backed record, credential and session stores.
//!
//! Schema lives in `migrations/` and is applied by [`PostgresStore::connect`].
//! Movie identities are `BIGSERIAL`; soft delete sets `deleted_at` and every
//! normal read filters on `deleted_at IS NULL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, Transaction};

use super::{CredentialStore, MovieStore, MovieTx, SessionStore};
use crate::{
    dto::movie::Page,
    errors::AppError,
    models::{
        movie::{Movie, MovieId, NewMovie},
        refresh_token::{NewRefreshToken, RefreshTokenRecord},
        user::{NewUser, User},
    },
};

const MOVIE_COLUMNS: &str = "id, title, director, year, plot, created_at, updated_at, deleted_at";

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct MovieRow {
    id: i64,
    title: String,
    director: String,
    year: i32,
    plot: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<MovieRow> for Movie {
    fn from(r: MovieRow) -> Self {
        Self {
            id: r.id as MovieId,
            title: r.title,
            director: r.director,
            year: r.year,
            plot: r.plot,
            created_at: r.created_at,
            updated_at: r.updated_at,
            deleted_at: r.deleted_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    full_name: String,
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id as u64,
            full_name: r.full_name,
            username: r.username,
            password_hash: r.password_hash,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct RefreshTokenRow {
    id: i64,
    user_id: i64,
    token_hash: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<RefreshTokenRow> for RefreshTokenRecord {
    fn from(r: RefreshTokenRow) -> Self {
        Self {
            id: r.id as u64,
            user_id: r.user_id as u64,
            token_hash: r.token_hash,
            expires_at: r.expires_at,
            created_at: r.created_at,
        }
    }
}

// Identities beyond i64 cannot exist in a BIGSERIAL column.
fn db_id(id: u64) -> Option<i64> {
    i64::try_from(id).ok()
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

#[async_trait]
impl MovieStore for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn MovieTx>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgMovieTx { tx }))
    }

    async fn find_live(&self, id: MovieId) -> Result<Option<Movie>, AppError> {
        let Some(id) = db_id(id) else {
            return Ok(None);
        };
        let row: Option<MovieRow> = sqlx::query_as(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Movie::from))
    }

    async fn list_live(&self, page: Page) -> Result<(Vec<Movie>, u64), AppError> {
        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM movies WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        let rows: Vec<MovieRow> = sqlx::query_as(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE deleted_at IS NULL \
             ORDER BY id LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(page.limit))
        .bind(i64::try_from(page.offset).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok((rows.into_iter().map(Movie::from).collect(), total as u64))
    }
}

struct PgMovieTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl MovieTx for PgMovieTx {
    async fn insert(&mut self, new: NewMovie, now: DateTime<Utc>) -> Result<Movie, AppError> {
        let row: MovieRow = sqlx::query_as(&format!(
            "INSERT INTO movies (title, director, year, plot, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) RETURNING {MOVIE_COLUMNS}"
        ))
        .bind(&new.title)
        .bind(&new.director)
        .bind(new.year)
        .bind(&new.plot)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(row.into())
    }

    async fn find_live_for_update(&mut self, id: MovieId) -> Result<Option<Movie>, AppError> {
        let Some(id) = db_id(id) else {
            return Ok(None);
        };
        let row: Option<MovieRow> = sqlx::query_as(&format!(
            "SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1 AND deleted_at IS NULL FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Movie::from))
    }

    async fn save(&mut self, movie: &Movie) -> Result<(), AppError> {
        let id = db_id(movie.id).ok_or(AppError::NotFound)?;
        let result = sqlx::query(
            "UPDATE movies SET title = $2, director = $3, year = $4, plot = $5, updated_at = $6 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(&movie.title)
        .bind(&movie.director)
        .bind(movie.year)
        .bind(&movie.plot)
        .bind(movie.updated_at)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn tombstone(&mut self, id: MovieId, at: DateTime<Utc>) -> Result<(), AppError> {
        let id = db_id(id).ok_or(AppError::NotFound)?;
        let result =
            sqlx::query("UPDATE movies SET deleted_at = $2 WHERE id = $1 AND deleted_at IS NULL")
                .bind(id)
                .bind(at)
                .execute(&mut *self.tx)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for PostgresStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, full_name, username, password_hash, created_at \
             FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn insert(&self, new: NewUser) -> Result<User, AppError> {
        let row: UserRow = sqlx::query_as(
            "INSERT INTO users (full_name, username, password_hash) VALUES ($1, $2, $3) \
             RETURNING id, full_name, username, password_hash, created_at",
        )
        .bind(&new.full_name)
        .bind(&new.username)
        .bind(&new.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::Conflict("username already taken".into());
            }
            AppError::from(e)
        })?;

        Ok(row.into())
    }
}

#[async_trait]
impl SessionStore for PostgresStore {
    async fn insert(&self, new: NewRefreshToken) -> Result<RefreshTokenRecord, AppError> {
        let user_id = db_id(new.user_id)
            .ok_or_else(|| AppError::Internal("user id out of range".into()))?;
        let row: RefreshTokenRow = sqlx::query_as(
            "INSERT INTO refresh_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3) \
             RETURNING id, user_id, token_hash, expires_at, created_at",
        )
        .bind(user_id)
        .bind(&new.token_hash)
        .bind(new.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::Conflict("refresh token already exists".into());
            }
            AppError::from(e)
        })?;

        Ok(row.into())
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>, AppError> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(
            "SELECT id, user_id, token_hash, expires_at, created_at \
             FROM refresh_tokens WHERE token_hash = $1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RefreshTokenRecord::from))
    }
}
