use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found")]
    NotFound,

    #[error("Database error: {0}")]
    Db(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// The only failure classes a caller ever sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidInput,
    Unauthorized,
    DependencyFailure,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::InvalidInput,
            AppError::Unauthorized => ErrorKind::Unauthorized,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::NotFound => ErrorKind::NotFound,
            AppError::Db(_) | AppError::Cache(_) | AppError::Config(_) | AppError::Internal(_) => {
                ErrorKind::DependencyFailure
            }
        }
    }

    /// Text that is safe to hand back to a client. Store-level detail stays in the logs.
    pub fn public_message(&self) -> &str {
        match self {
            AppError::Validation(s) => s.as_str(),
            AppError::Unauthorized => "unauthorized",
            AppError::Conflict(s) => s.as_str(),
            AppError::NotFound => "not found",
            AppError::Db(_) | AppError::Cache(_) | AppError::Config(_) | AppError::Internal(_) => {
                "internal error"
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Db(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        AppError::Db(format!("migration: {e}"))
    }
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        AppError::Cache(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Internal(format!("json: {e}"))
    }
}
