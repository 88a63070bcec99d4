use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sha2::{Digest, Sha256};

use crate::{
    errors::AppError,
    models::{jwt::Claims, user::UserId},
};

pub const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Clone)]
pub struct Keys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
}

impl Keys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

pub fn sha256_hex(s: &str) -> String {
    let mut h = Sha256::new();
    h.update(s.as_bytes());
    hex::encode(h.finalize())
}

pub fn new_access_claims(user_id: UserId, ttl_seconds: i64) -> Claims {
    let now = Utc::now();
    Claims {
        sub: user_id.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + Duration::seconds(ttl_seconds)).timestamp() as usize,
    }
}

/// Signing only fails on a broken key, which is a configuration problem rather than a client one.
pub fn make_token(keys: &Keys, claims: &Claims) -> Result<String, AppError> {
    encode(&Header::new(ALGORITHM), claims, &keys.encoding)
        .map_err(|e| AppError::Internal(format!("jwt sign: {e}")))
}

/// Every parse, algorithm, signature or expiry failure collapses into `Unauthorized`.
pub fn decode_token(keys: &Keys, token: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(ALGORITHM);
    validation.leeway = 0;

    decode::<Claims>(token, &keys.decoding, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "access token rejected");
            AppError::Unauthorized
        })
}

pub fn subject(claims: &Claims) -> Result<UserId, AppError> {
    claims.sub.parse().map_err(|_| AppError::Unauthorized)
}
