//! Movie catalog core: a Postgres record store fronted by a write-through movie
//! cache, plus user registration and token-based sessions.
//!
//! HTTP binding and process wiring live with the caller; everything here is
//! reachable through [`state::AppState`] and the functions in [`services`].

pub mod auth;
pub mod cache;
pub mod config;
pub mod dto;
pub mod errors;
pub mod models;
pub mod password;
pub mod services;
pub mod state;
pub mod store;
pub mod telemetry;

pub use config::{AuthConfig, CacheConfig, CachePolicy, Config};
pub use errors::{AppError, ErrorKind};
pub use state::AppState;
