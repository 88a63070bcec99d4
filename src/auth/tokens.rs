use chrono::{Duration, Utc};
use rand::RngCore;

use crate::{
    auth::jwt::{make_token, new_access_claims, sha256_hex, Keys},
    config::AuthConfig,
    errors::AppError,
    models::{refresh_token::NewRefreshToken, user::UserId},
    store::SessionStore,
};

pub const TOKEN_TYPE: &str = "Bearer";

#[derive(Debug, Clone)]
pub struct IssuedTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

/// 256 bits from the OS RNG, hex-encoded.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn issue_access_token(keys: &Keys, cfg: &AuthConfig, user_id: UserId) -> Result<String, AppError> {
    make_token(keys, &new_access_claims(user_id, cfg.access_ttl_seconds))
}

/// Only the SHA-256 fingerprint of the refresh token is persisted.
pub async fn issue_tokens_and_store_refresh(
    sessions: &dyn SessionStore,
    keys: &Keys,
    cfg: &AuthConfig,
    user_id: UserId,
) -> Result<IssuedTokens, AppError> {
    let access_token = issue_access_token(keys, cfg, user_id)?;
    let refresh_token = generate_refresh_token();

    sessions
        .insert(NewRefreshToken {
            user_id,
            token_hash: sha256_hex(&refresh_token),
            expires_at: Utc::now() + Duration::seconds(cfg.refresh_ttl_seconds),
        })
        .await?;

    Ok(IssuedTokens {
        access_token,
        refresh_token,
        token_type: TOKEN_TYPE.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemorySessionStore;

    #[test]
    fn refresh_tokens_are_long_and_distinct() {
        let a = generate_refresh_token();
        let b = generate_refresh_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn issued_refresh_token_is_stored_by_fingerprint() {
        let sessions = MemorySessionStore::new();
        let keys = Keys::from_secret(b"k");
        let cfg = AuthConfig::new("k");

        let issued = issue_tokens_and_store_refresh(&sessions, &keys, &cfg, 3)
            .await
            .unwrap();
        assert_eq!(issued.token_type, "Bearer");

        assert!(sessions
            .find_by_hash(&issued.refresh_token)
            .await
            .unwrap()
            .is_none());
        let record = sessions
            .find_by_hash(&sha256_hex(&issued.refresh_token))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.user_id, 3);

        let ttl = record.expires_at - record.created_at;
        assert!((ttl.num_seconds() - cfg.refresh_ttl_seconds).abs() <= 1);
    }
}
