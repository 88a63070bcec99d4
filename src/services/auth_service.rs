use chrono::Utc;

use crate::{
    auth::{
        jwt::{decode_token, sha256_hex, subject},
        tokens::{issue_access_token, issue_tokens_and_store_refresh, IssuedTokens, TOKEN_TYPE},
    },
    dto::auth::{
        LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, RegisterRequest,
        RegisterResponse,
    },
    errors::AppError,
    models::user::{NewUser, UserId},
    password::{hash_password, verify_password},
    state::AppState,
};

// argon2 is deliberately slow; keep it off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("blocking task: {e}")))?
}

pub async fn register(state: &AppState, req: RegisterRequest) -> Result<RegisterResponse, AppError> {
    let req = req.normalize()?;

    // fast path only; the store's unique index settles races
    if state.users.find_by_username(&req.username).await?.is_some() {
        tracing::warn!(username = %req.username, "duplicate username during registration");
        return Err(AppError::Conflict("username already taken".into()));
    }

    let password = req.password;
    let password_hash = blocking(move || hash_password(&password)).await?;

    let user = state
        .users
        .insert(NewUser {
            full_name: req.full_name,
            username: req.username.clone(),
            password_hash,
        })
        .await
        .inspect_err(|e| match e {
            AppError::Conflict(_) => {
                tracing::warn!(username = %req.username, "username taken by a concurrent registration")
            }
            _ => tracing::error!(username = %req.username, error = %e, "failed to register user"),
        })?;

    tracing::info!(user_id = user.id, username = %user.username, "user registered");
    Ok(RegisterResponse {
        user: user.into(),
        message: "user registered successfully".into(),
    })
}

/// Absent user and wrong password are the same `Unauthorized`.
pub async fn login(state: &AppState, req: LoginRequest) -> Result<LoginResponse, AppError> {
    let username = req.username.trim().to_string();

    let Some(user) = state.users.find_by_username(&username).await? else {
        tracing::warn!(username = %username, "invalid login attempt");
        return Err(AppError::Unauthorized);
    };

    let password = req.password;
    let stored = user.password_hash.clone();
    if !blocking(move || verify_password(&password, &stored)).await? {
        tracing::warn!(username = %username, "invalid login attempt");
        return Err(AppError::Unauthorized);
    }

    let tokens = issue_token_pair(state, user.id).await?;
    tracing::info!(user_id = user.id, "user logged in");
    Ok(tokens.into())
}

pub async fn issue_token_pair(state: &AppState, user_id: UserId) -> Result<IssuedTokens, AppError> {
    issue_tokens_and_store_refresh(
        state.refresh_tokens.as_ref(),
        &state.keys,
        &state.cfg.auth,
        user_id,
    )
    .await
    .inspect(|_| tracing::debug!(user_id, "token pair issued"))
    .inspect_err(|e| tracing::error!(user_id, error = %e, "failed to issue tokens"))
}

/// Mints a new access token. The presented refresh token stays valid until its own expiry.
pub async fn refresh(state: &AppState, req: RefreshRequest) -> Result<RefreshResponse, AppError> {
    let token_hash = sha256_hex(req.refresh_token.trim());

    let record = match state.refresh_tokens.find_by_hash(&token_hash).await? {
        Some(r) if !r.is_expired_at(Utc::now()) => r,
        _ => {
            tracing::warn!("invalid or expired refresh token");
            return Err(AppError::Unauthorized);
        }
    };

    let access_token = issue_access_token(&state.keys, &state.cfg.auth, record.user_id)?;
    tracing::info!(user_id = record.user_id, "access token refreshed");

    Ok(RefreshResponse {
        access_token,
        token_type: TOKEN_TYPE.to_string(),
    })
}

/// Signature, algorithm and expiry check; no store lookup.
pub fn validate_access(state: &AppState, token: &str) -> Result<UserId, AppError> {
    let claims = decode_token(&state.keys, token)?;
    subject(&claims)
}

/// Validates an `Authorization` header value of the form `Bearer <token>`.
pub fn authenticate(state: &AppState, authorization: &str) -> Result<UserId, AppError> {
    let (scheme, token) = authorization
        .trim()
        .split_once(' ')
        .ok_or(AppError::Unauthorized)?;

    if !scheme.eq_ignore_ascii_case(TOKEN_TYPE) {
        return Err(AppError::Unauthorized);
    }
    validate_access(state, token.trim())
}
