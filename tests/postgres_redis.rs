//! Runs against real backends: `DATABASE_URL=... REDIS_URL=... cargo test -- --ignored`.

use movie_catalog::{
    dto::{
        auth::{LoginRequest, RefreshRequest, RegisterRequest},
        movie::{CreateMovieRequest, UpdateMovieRequest},
    },
    services::{
        auth_service::{login, refresh, register, validate_access},
        movie_service::{create_movie, delete_movie, get_movie, update_movie},
    },
    AppError, AppState, AuthConfig, Config,
};

async fn live_state() -> AppState {
    movie_catalog::telemetry::init_tracing();

    let mut cfg = Config::new(AuthConfig::new("live-backend-secret"));
    cfg.database_url = Some(std::env::var("DATABASE_URL").expect("DATABASE_URL"));
    if let Ok(url) = std::env::var("REDIS_URL") {
        cfg.redis_url = url;
    }
    AppState::connect(&cfg).await.expect("connect stores")
}

#[tokio::test]
#[ignore = "needs Postgres and Redis"]
async fn movie_lifecycle_against_live_stores() {
    let state = live_state().await;

    let created = create_movie(
        &state,
        CreateMovieRequest {
            title: "Stalker".into(),
            director: "Tarkovsky".into(),
            year: 1979,
            plot: "A guide leads two men through the Zone.".into(),
        },
    )
    .await
    .unwrap();

    let read = get_movie(&state, created.id).await.unwrap();
    assert_eq!(read.created_at, created.created_at);
    assert_eq!(state.movie_cache.get(created.id).await.unwrap().map(|m| m.id), Some(created.id));

    let updated = update_movie(
        &state,
        created.id,
        UpdateMovieRequest {
            year: Some(1980),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.title, "Stalker");

    // a cold read must agree with the snapshot written by the update
    state.movie_cache.remove(created.id).await.unwrap();
    let cold = get_movie(&state, created.id).await.unwrap();
    assert_eq!(cold.year, 1980);
    assert_eq!(cold.updated_at, updated.updated_at);

    delete_movie(&state, created.id).await.unwrap();
    assert!(matches!(
        get_movie(&state, created.id).await,
        Err(AppError::NotFound)
    ));
    assert!(state.movie_cache.get(created.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "needs Postgres and Redis"]
async fn session_lifecycle_against_live_stores() {
    let state = live_state().await;
    let username = format!("user-{}", chrono::Utc::now().timestamp_micros());

    let user = register(
        &state,
        RegisterRequest {
            full_name: "Live User".into(),
            username: username.clone(),
            password: "long-password".into(),
        },
    )
    .await
    .unwrap()
    .user;

    let tokens = login(
        &state,
        LoginRequest {
            username,
            password: "long-password".into(),
        },
    )
    .await
    .unwrap();

    let refreshed = refresh(
        &state,
        RefreshRequest {
            refresh_token: tokens.refresh_token,
        },
    )
    .await
    .unwrap();
    assert_eq!(validate_access(&state, &refreshed.access_token).unwrap(), user.id);
}
