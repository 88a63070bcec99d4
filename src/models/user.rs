use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = u64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,

    pub full_name: String,
    pub username: String,

    // argon2 PHC string, never the plaintext
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserPublic {
    pub id: UserId,
    pub full_name: String,
    pub username: String,
    pub created_at: String,
}

impl From<User> for UserPublic {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            full_name: u.full_name,
            username: u.username,
            created_at: u.created_at.to_rfc3339(),
        }
    }
}
