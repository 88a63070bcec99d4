//! In-process stores. Identities come from atomic counters that, like a database
//! sequence, are not handed back when a transaction rolls back.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

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

type MovieTable = Arc<RwLock<BTreeMap<MovieId, Movie>>>;

#[derive(Debug)]
pub struct MemoryMovieStore {
    rows: MovieTable,
    next_id: Arc<AtomicU64>,
}

impl Default for MemoryMovieStore {
    fn default() -> Self {
        Self {
            rows: Arc::default(),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl MemoryMovieStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row by identity including tombstoned ones.
    pub async fn raw(&self, id: MovieId) -> Option<Movie> {
        self.rows.read().await.get(&id).cloned()
    }
}

#[async_trait]
impl MovieStore for MemoryMovieStore {
    async fn begin(&self) -> Result<Box<dyn MovieTx>, AppError> {
        Ok(Box::new(MemoryMovieTx {
            rows: Arc::clone(&self.rows),
            next_id: Arc::clone(&self.next_id),
            staged: BTreeMap::new(),
            locked: HashSet::new(),
        }))
    }

    async fn find_live(&self, id: MovieId) -> Result<Option<Movie>, AppError> {
        Ok(self
            .rows
            .read()
            .await
            .get(&id)
            .filter(|m| m.is_live())
            .cloned())
    }

    async fn list_live(&self, page: Page) -> Result<(Vec<Movie>, u64), AppError> {
        let rows = self.rows.read().await;
        let live = rows.values().filter(|m| m.is_live());
        let total = live.clone().count() as u64;
        let items = live
            .skip(usize::try_from(page.offset).unwrap_or(usize::MAX))
            .take(page.limit as usize)
            .cloned()
            .collect();
        Ok((items, total))
    }
}

/// Stages writes and applies them on commit. Rows read for update are
/// re-checked at commit under the table lock: if another transaction
/// tombstoned one of them in the meantime the commit fails with `NotFound`.
/// Concurrent updates to a row that is still live are last-write-wins.
struct MemoryMovieTx {
    rows: MovieTable,
    next_id: Arc<AtomicU64>,
    staged: BTreeMap<MovieId, Movie>,
    locked: HashSet<MovieId>,
}

#[async_trait]
impl MovieTx for MemoryMovieTx {
    async fn insert(&mut self, new: NewMovie, now: DateTime<Utc>) -> Result<Movie, AppError> {
        let movie = Movie {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            title: new.title,
            director: new.director,
            year: new.year,
            plot: new.plot,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.staged.insert(movie.id, movie.clone());
        Ok(movie)
    }

    async fn find_live_for_update(&mut self, id: MovieId) -> Result<Option<Movie>, AppError> {
        if let Some(m) = self.staged.get(&id) {
            return Ok(Some(m.clone()).filter(Movie::is_live));
        }

        let current = self.rows.read().await.get(&id).cloned().filter(Movie::is_live);
        if current.is_some() {
            self.locked.insert(id);
        }
        Ok(current)
    }

    async fn save(&mut self, movie: &Movie) -> Result<(), AppError> {
        self.staged.insert(movie.id, movie.clone());
        Ok(())
    }

    async fn tombstone(&mut self, id: MovieId, at: DateTime<Utc>) -> Result<(), AppError> {
        let mut movie = self
            .find_live_for_update(id)
            .await?
            .ok_or(AppError::NotFound)?;
        movie.deleted_at = Some(at);
        self.staged.insert(id, movie);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let MemoryMovieTx {
            rows,
            staged,
            locked,
            ..
        } = *self;
        let mut rows = rows.write().await;

        if !locked
            .iter()
            .all(|id| rows.get(id).is_some_and(Movie::is_live))
        {
            return Err(AppError::NotFound);
        }

        rows.extend(staged);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), AppError> {
        Ok(())
    }
}

#[derive(Debug)]
pub struct MemoryCredentialStore {
    users: RwLock<HashMap<String, User>>,
    next_id: AtomicU64,
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self {
            users: RwLock::default(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn insert(&self, new: NewUser) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        if users.contains_key(&new.username) {
            return Err(AppError::Conflict("username already taken".into()));
        }

        let user = User {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            full_name: new.full_name,
            username: new.username,
            password_hash: new.password_hash,
            created_at: Utc::now(),
        };
        users.insert(user.username.clone(), user.clone());
        Ok(user)
    }
}

#[derive(Debug)]
pub struct MemorySessionStore {
    tokens: RwLock<HashMap<String, RefreshTokenRecord>>,
    next_id: AtomicU64,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self {
            tokens: RwLock::default(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }

    /// Inserts a fully-formed record, bypassing the TTL the token authority would apply.
    pub async fn insert_record(&self, record: RefreshTokenRecord) {
        self.tokens
            .write()
            .await
            .insert(record.token_hash.clone(), record);
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, new: NewRefreshToken) -> Result<RefreshTokenRecord, AppError> {
        let mut tokens = self.tokens.write().await;
        if tokens.contains_key(&new.token_hash) {
            return Err(AppError::Conflict("refresh token already exists".into()));
        }

        let record = RefreshTokenRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            user_id: new.user_id,
            token_hash: new.token_hash,
            expires_at: new.expires_at,
            created_at: Utc::now(),
        };
        tokens.insert(record.token_hash.clone(), record.clone());
        Ok(record)
    }

    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshTokenRecord>, AppError> {
        Ok(self.tokens.read().await.get(token_hash).cloned())
    }
}
