use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_USERNAME_LEN: usize = 100;
pub const MAX_FULL_NAME_LEN: usize = 255;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub full_name: String,
    pub username: String,
    pub password: String,
}

impl RegisterRequest {
    /// Trims the identity fields and rejects anything the store should never see.
    pub fn normalize(self) -> Result<Self, AppError> {
        let full_name = self.full_name.trim().to_string();
        let username = self.username.trim().to_string();

        if full_name.is_empty() || username.is_empty() {
            return Err(AppError::Validation("full_name/username required".into()));
        }
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(AppError::Validation(format!(
                "username must be at most {MAX_USERNAME_LEN} characters"
            )));
        }
        if full_name.chars().count() > MAX_FULL_NAME_LEN {
            return Err(AppError::Validation(format!(
                "full_name must be at most {MAX_FULL_NAME_LEN} characters"
            )));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        Ok(Self {
            full_name,
            username,
            password: self.password,
        })
    }
}

#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Serialize, Debug)]
pub struct RegisterResponse {
    pub user: crate::models::user::UserPublic,
    pub message: String,
}

#[derive(Serialize, Debug)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

impl From<crate::auth::tokens::IssuedTokens> for LoginResponse {
    fn from(t: crate::auth::tokens::IssuedTokens) -> Self {
        Self {
            access_token: t.access_token,
            refresh_token: t.refresh_token,
            token_type: t.token_type,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: String,
}
