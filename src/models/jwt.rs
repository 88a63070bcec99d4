use serde::{Deserialize, Serialize};

/// Access-token claims. `sub` carries the user id as a decimal string.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}
