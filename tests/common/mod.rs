#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use movie_catalog::{
    cache::{memory::MemoryCache, CacheStore},
    dto::movie::{CreateMovieRequest, Page},
    models::movie::{Movie, MovieId, NewMovie},
    store::{
        memory::{MemoryCredentialStore, MemoryMovieStore, MemorySessionStore},
        MovieStore, MovieTx,
    },
    AppError, AppState, AuthConfig, CachePolicy, Config,
};

pub const SECRET: &str = "integration-test-secret";

/// Memory cache that can be switched into an outage.
#[derive(Default)]
pub struct FlakyCache {
    inner: MemoryCache,
    down: AtomicBool,
}

impl FlakyCache {
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), AppError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(AppError::Cache("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for FlakyCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, AppError> {
        self.check()?;
        self.inner.get(key).await
    }

    async fn set_ex(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), AppError> {
        self.check()?;
        self.inner.set_ex(key, value, ttl).await
    }

    async fn del(&self, key: &str) -> Result<(), AppError> {
        self.check()?;
        self.inner.del(key).await
    }
}

/// Record store that counts the reads that bypass the cache and can be told
/// to lose its connection at commit time.
#[derive(Default)]
pub struct CountingMovieStore {
    pub inner: MemoryMovieStore,
    reads: AtomicUsize,
    fail_commits: Arc<AtomicBool>,
}

impl CountingMovieStore {
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn set_commits_failing(&self, failing: bool) {
        self.fail_commits.store(failing, Ordering::SeqCst);
    }
}

struct CommitGuardTx {
    inner: Box<dyn MovieTx>,
    fail: Arc<AtomicBool>,
}

#[async_trait]
impl MovieTx for CommitGuardTx {
    async fn insert(&mut self, new: NewMovie, now: DateTime<Utc>) -> Result<Movie, AppError> {
        self.inner.insert(new, now).await
    }

    async fn find_live_for_update(&mut self, id: MovieId) -> Result<Option<Movie>, AppError> {
        self.inner.find_live_for_update(id).await
    }

    async fn save(&mut self, movie: &Movie) -> Result<(), AppError> {
        self.inner.save(movie).await
    }

    async fn tombstone(&mut self, id: MovieId, at: DateTime<Utc>) -> Result<(), AppError> {
        self.inner.tombstone(id, at).await
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        if self.fail.load(Ordering::SeqCst) {
            self.inner.rollback().await?;
            return Err(AppError::Db("connection reset during commit".into()));
        }
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        self.inner.rollback().await
    }
}

#[async_trait]
impl MovieStore for CountingMovieStore {
    async fn begin(&self) -> Result<Box<dyn MovieTx>, AppError> {
        Ok(Box::new(CommitGuardTx {
            inner: self.inner.begin().await?,
            fail: Arc::clone(&self.fail_commits),
        }))
    }

    async fn find_live(&self, id: MovieId) -> Result<Option<Movie>, AppError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.find_live(id).await
    }

    async fn list_live(&self, page: Page) -> Result<(Vec<Movie>, u64), AppError> {
        self.inner.list_live(page).await
    }
}

pub struct Harness {
    pub state: AppState,
    pub movies: Arc<CountingMovieStore>,
    pub cache: Arc<FlakyCache>,
    pub users: Arc<MemoryCredentialStore>,
    pub sessions: Arc<MemorySessionStore>,
}

pub fn config(policy: CachePolicy) -> Config {
    let mut cfg = Config::new(AuthConfig::new(SECRET));
    cfg.cache.movie_ttl_seconds = 60;
    cfg.cache.policy = policy;
    cfg
}

pub fn harness(policy: CachePolicy) -> Harness {
    movie_catalog::telemetry::init_tracing();

    let movies = Arc::new(CountingMovieStore::default());
    let cache = Arc::new(FlakyCache::default());
    let users = Arc::new(MemoryCredentialStore::new());
    let sessions = Arc::new(MemorySessionStore::new());

    let state = AppState::from_parts(
        &config(policy),
        movies.clone(),
        cache.clone(),
        users.clone(),
        sessions.clone(),
    );

    Harness {
        state,
        movies,
        cache,
        users,
        sessions,
    }
}

pub fn dune() -> CreateMovieRequest {
    CreateMovieRequest {
        title: "Dune".into(),
        director: "Villeneuve".into(),
        year: 2021,
        plot: "A noble family becomes embroiled in a war for control of Arrakis.".into(),
    }
}
