//! Disposable, time-boxed copies of movie records.
//!
//! The cache never owns data. Entries are JSON snapshots under `movie:{id}` and
//! vanish after a fixed TTL whether or not anyone evicts them.

pub mod memory;
pub mod redis;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::{
    errors::AppError,
    models::movie::{Movie, MovieId},
};

/// Key/value store with per-entry expiry. Each call is atomic on its own key and nothing more.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError>;

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), AppError>;

    async fn del(&self, key: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct MovieCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl MovieCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub fn key(id: MovieId) -> String {
        format!("movie:{id}")
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// `Ok(None)` on a miss. A snapshot that no longer decodes counts as a miss.
    pub async fn get(&self, id: MovieId) -> Result<Option<Movie>, AppError> {
        let Some(bytes) = self.store.get(&Self::key(id)).await? else {
            tracing::debug!(movie_id = id, "movie cache miss");
            return Ok(None);
        };

        match serde_json::from_slice::<Movie>(&bytes) {
            Ok(movie) => {
                tracing::debug!(movie_id = id, "movie cache hit");
                Ok(Some(movie))
            }
            Err(e) => {
                tracing::warn!(movie_id = id, error = %e, "undecodable movie snapshot in cache");
                Ok(None)
            }
        }
    }

    pub async fn put(&self, movie: &Movie) -> Result<(), AppError> {
        let data = serde_json::to_vec(movie)?;
        self.store
            .set_ex(&Self::key(movie.id), data, self.ttl)
            .await
            .inspect_err(|e| tracing::error!(movie_id = movie.id, error = %e, "failed to cache movie"))?;

        tracing::debug!(movie_id = movie.id, ttl_secs = self.ttl.as_secs(), "movie cached");
        Ok(())
    }

    pub async fn remove(&self, id: MovieId) -> Result<(), AppError> {
        self.store
            .del(&Self::key(id))
            .await
            .inspect_err(|e| tracing::error!(movie_id = id, error = %e, "failed to evict movie"))?;

        tracing::debug!(movie_id = id, "movie evicted from cache");
        Ok(())
    }
}
