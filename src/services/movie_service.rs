//! Movie reads and writes.
//!
//! Writes run inside one record-store transaction and carry their outcome to the
//! cache (fresh snapshot on create/update, eviction on delete). Under
//! [`CachePolicy::Strict`] the cache is touched before commit and a cache failure
//! rolls the transaction back, so a successful write never leaves a stale entry.
//! Reads go cache first and repopulate on a miss; the cache is never allowed to
//! fail a read.

use chrono::{DateTime, SubsecRound, Utc};

use crate::{
    config::CachePolicy,
    dto::movie::{
        CreateMovieRequest, CreateMovieResponse, DeleteMovieResponse, ListMoviesQuery,
        ListMoviesResponse, MovieResponse, UpdateMovieRequest, UpdateMovieResponse,
    },
    errors::AppError,
    models::movie::{Movie, MovieId},
    state::AppState,
    store::MovieTx,
};

enum Propagation<'a> {
    Put(&'a Movie),
    Remove(MovieId),
}

impl Propagation<'_> {
    fn movie_id(&self) -> MovieId {
        match self {
            Propagation::Put(m) => m.id,
            Propagation::Remove(id) => *id,
        }
    }
}

// Postgres keeps microseconds; truncating here keeps cached snapshots byte-equal to stored rows.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

async fn propagate(state: &AppState, p: &Propagation<'_>) -> Result<(), AppError> {
    match p {
        Propagation::Put(movie) => state.movie_cache.put(movie).await,
        Propagation::Remove(id) => state.movie_cache.remove(*id).await,
    }
}

async fn abort(tx: Box<dyn MovieTx>, movie_id: MovieId) {
    if let Err(e) = tx.rollback().await {
        tracing::error!(movie_id, error = %e, "rollback failed");
    }
}

/// Commits `tx` and carries the same outcome to the cache according to the configured policy.
async fn commit_with_cache(
    state: &AppState,
    tx: Box<dyn MovieTx>,
    p: Propagation<'_>,
) -> Result<(), AppError> {
    let movie_id = p.movie_id();

    match state.cfg.cache.policy {
        CachePolicy::Strict => {
            if let Err(e) = propagate(state, &p).await {
                tracing::warn!(movie_id, "cache propagation failed; aborting write");
                abort(tx, movie_id).await;
                return Err(e);
            }

            if let Err(e) = tx.commit().await {
                // the cache may now be ahead of the store
                if let Err(evict) = state.movie_cache.remove(movie_id).await {
                    tracing::error!(movie_id, error = %evict, "could not evict after failed commit");
                }
                return Err(e);
            }
        }
        CachePolicy::BestEffort => {
            tx.commit().await?;

            if let Err(e) = propagate(state, &p).await {
                tracing::warn!(movie_id, error = %e, "cache propagation failed after commit");
                if let Propagation::Put(_) = p {
                    if let Err(evict) = state.movie_cache.remove(movie_id).await {
                        tracing::error!(movie_id, error = %evict, "could not evict stale snapshot");
                    }
                }
            }
        }
    }

    Ok(())
}

pub async fn create_movie(
    state: &AppState,
    req: CreateMovieRequest,
) -> Result<CreateMovieResponse, AppError> {
    let new = req.validate()?;
    let title = new.title.clone();

    let result = async {
        let mut tx = state.movies.begin().await?;
        let movie = tx.insert(new, now()).await?;
        commit_with_cache(state, tx, Propagation::Put(&movie)).await?;
        Ok::<_, AppError>(movie)
    }
    .await;

    match result {
        Ok(movie) => {
            tracing::info!(movie_id = movie.id, "movie created");
            Ok(movie.into())
        }
        Err(e) => {
            tracing::error!(title = %title, error = %e, "failed to create movie");
            Err(e)
        }
    }
}

pub async fn get_movie(state: &AppState, id: MovieId) -> Result<MovieResponse, AppError> {
    match state.movie_cache.get(id).await {
        Ok(Some(movie)) if movie.is_live() => return Ok(movie.into()),
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(movie_id = id, error = %e, "cache read failed; falling back to store");
        }
    }

    let movie = state
        .movies
        .find_live(id)
        .await
        .inspect_err(|e| tracing::error!(movie_id = id, error = %e, "failed to load movie"))?
        .ok_or(AppError::NotFound)?;

    if let Err(e) = state.movie_cache.put(&movie).await {
        tracing::warn!(movie_id = id, error = %e, "could not repopulate movie cache");
    }

    Ok(movie.into())
}

pub async fn list_movies(
    state: &AppState,
    query: ListMoviesQuery,
) -> Result<ListMoviesResponse, AppError> {
    let page = query.validate()?;
    let (movies, total_count) = state.movies.list_live(page).await.inspect_err(|e| {
        tracing::error!(limit = page.limit, offset = page.offset, error = %e, "failed to list movies")
    })?;

    Ok(ListMoviesResponse {
        movies: movies.into_iter().map(MovieResponse::from).collect(),
        total_count,
    })
}

pub async fn update_movie(
    state: &AppState,
    id: MovieId,
    req: UpdateMovieRequest,
) -> Result<UpdateMovieResponse, AppError> {
    let patch = req.validate()?;

    let result = async {
        let mut tx = state.movies.begin().await?;
        let mut movie = tx
            .find_live_for_update(id)
            .await?
            .ok_or(AppError::NotFound)?;

        patch.apply(&mut movie, now());
        tx.save(&movie).await?;
        commit_with_cache(state, tx, Propagation::Put(&movie)).await?;
        Ok::<_, AppError>(movie)
    }
    .await;

    match result {
        Ok(movie) => {
            tracing::info!(movie_id = id, "movie updated");
            Ok(movie.into())
        }
        Err(AppError::NotFound) => Err(AppError::NotFound),
        Err(e) => {
            tracing::error!(movie_id = id, error = %e, "failed to update movie");
            Err(e)
        }
    }
}

pub async fn delete_movie(state: &AppState, id: MovieId) -> Result<DeleteMovieResponse, AppError> {
    let result = async {
        let mut tx = state.movies.begin().await?;
        if tx.find_live_for_update(id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        tx.tombstone(id, now()).await?;
        commit_with_cache(state, tx, Propagation::Remove(id)).await
    }
    .await;

    match result {
        Ok(()) => {
            tracing::info!(movie_id = id, "movie deleted");
            Ok(DeleteMovieResponse {
                message: "movie deleted successfully".into(),
            })
        }
        Err(AppError::NotFound) => Err(AppError::NotFound),
        Err(e) => {
            tracing::error!(movie_id = id, error = %e, "failed to delete movie");
            Err(e)
        }
    }
}
