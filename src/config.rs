use std::str::FromStr;

use crate::errors::AppError;

/// How a movie write treats a failed cache propagation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Cache is updated before the durable commit; a cache failure aborts the write.
    #[default]
    Strict,
    /// Durable commit first; cache failures are logged and the write still succeeds.
    BestEffort,
}

impl FromStr for CachePolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(CachePolicy::Strict),
            "best_effort" | "best-effort" => Ok(CachePolicy::BestEffort),
            other => Err(AppError::Config(format!(
                "MOVIE_CACHE_POLICY must be strict or best_effort, got {other:?}"
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            access_ttl_seconds: 15 * 60,
            refresh_ttl_seconds: 30 * 24 * 60 * 60,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub movie_ttl_seconds: u64,
    pub policy: CachePolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            movie_ttl_seconds: 60 * 60,
            policy: CachePolicy::Strict,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub redis_url: String,

    pub auth: AuthConfig,
    pub cache: CacheConfig,
}

impl Config {
    /// Local defaults around the given auth settings; no store URLs.
    pub fn new(auth: AuthConfig) -> Self {
        Self {
            database_url: None,
            database_max_connections: 10,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            auth,
            cache: CacheConfig::default(),
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        dotenv::dotenv().ok();

        let jwt_secret = std::env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Config("JWT_SECRET is required".into()))?;

        let access_ttl_seconds = env_or("JWT_ACCESS_TTL_SECONDS", 15 * 60);
        let refresh_ttl_seconds = env_or("JWT_REFRESH_TTL_SECONDS", 30 * 24 * 60 * 60);
        if access_ttl_seconds <= 0 || refresh_ttl_seconds <= 0 {
            return Err(AppError::Config("token TTLs must be positive".into()));
        }

        let policy = match std::env::var("MOVIE_CACHE_POLICY") {
            Ok(v) => v.parse()?,
            Err(_) => CachePolicy::default(),
        };

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").ok(),
            database_max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            auth: AuthConfig {
                jwt_secret,
                access_ttl_seconds,
                refresh_ttl_seconds,
            },
            cache: CacheConfig {
                movie_ttl_seconds: env_or("MOVIE_CACHE_TTL_SECONDS", 60 * 60),
                policy,
            },
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
