//! Durable stores behind the movie and session subsystems.
//!
//! `MovieStore` is the record store; every mutation goes through a [`MovieTx`] so the
//! caller decides when (and whether) the write becomes visible. `CredentialStore` and
//! `SessionStore` are independent of each other and of the movie tables.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    dto::movie::Page,
    errors::AppError,
    models::{
        movie::{Movie, MovieId, NewMovie},
        refresh_token::{NewRefreshToken, RefreshTokenRecord},
        user::{NewUser, User},
    },
};

#[async_trait]
pub trait MovieStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn MovieTx>, AppError>;

    /// Live (non-tombstoned) record by identity.
    async fn find_live(&self, id: MovieId) -> Result<Option<Movie>, AppError>;

    /// A page of live records ordered by identity, plus the total live count.
    async fn list_live(&self, page: Page) -> Result<(Vec<Movie>, u64), AppError>;
}

/// One durable transaction. Dropping it without `commit` discards every staged change.
#[async_trait]
pub trait MovieTx: Send {
    async fn insert(&mut self, new: NewMovie, now: DateTime<Utc>) -> Result<Movie, AppError>;

    async fn find_live_for_update(&mut self, id: MovieId) -> Result<Option<Movie>, AppError>;

    async fn save(&mut self, movie: &Movie) -> Result<(), AppError>;

    async fn tombstone(&mut self, id: MovieId, at: DateTime<Utc>) -> Result<(), AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;

    async fn rollback(self: Box<Self>) -> Result<(), AppError>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Fails with `Conflict` when the username is already held; this is the authoritative check.
    async fn insert(&self, new: NewUser) -> Result<User, AppError>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, new: NewRefreshToken) -> Result<RefreshTokenRecord, AppError>;

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>, AppError>;
}
