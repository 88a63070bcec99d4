use std::sync::Arc;
use std::time::Duration;

use crate::{
    auth::jwt::Keys,
    cache::{memory::MemoryCache, redis::RedisCache, CacheStore, MovieCache},
    config::Config,
    errors::AppError,
    store::{
        memory::{MemoryCredentialStore, MemoryMovieStore, MemorySessionStore},
        postgres::PostgresStore,
        CredentialStore, MovieStore, SessionStore,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub movies: Arc<dyn MovieStore>,
    pub movie_cache: MovieCache,
    pub users: Arc<dyn CredentialStore>,
    pub refresh_tokens: Arc<dyn SessionStore>,
    pub keys: Keys,
    pub cfg: Arc<Config>,
}

impl AppState {
    /// Postgres for every durable store, Redis for the movie cache.
    pub async fn connect(cfg: &Config) -> Result<Self, AppError> {
        let database_url = cfg
            .database_url
            .as_deref()
            .ok_or_else(|| AppError::Config("DATABASE_URL is required".into()))?;

        let pg = Arc::new(PostgresStore::connect(database_url, cfg.database_max_connections).await?);
        let redis = Arc::new(RedisCache::connect(&cfg.redis_url).await?);
        tracing::info!(max_connections = cfg.database_max_connections, "stores connected");

        Ok(Self::from_parts(cfg, pg.clone(), redis, pg.clone(), pg))
    }

    pub fn in_memory(cfg: &Config) -> Self {
        Self::from_parts(
            cfg,
            Arc::new(MemoryMovieStore::new()),
            Arc::new(MemoryCache::new()),
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(MemorySessionStore::new()),
        )
    }

    pub fn from_parts(
        cfg: &Config,
        movies: Arc<dyn MovieStore>,
        cache: Arc<dyn CacheStore>,
        users: Arc<dyn CredentialStore>,
        refresh_tokens: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            movies,
            movie_cache: MovieCache::new(cache, Duration::from_secs(cfg.cache.movie_ttl_seconds)),
            users,
            refresh_tokens,
            keys: Keys::from_secret(cfg.auth.jwt_secret.as_bytes()),
            cfg: Arc::new(cfg.clone()),
        }
    }
}
