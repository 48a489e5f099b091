//! Error types for the catalog store

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("unknown genre id: {0}")]
    UnknownGenre(i64),

    #[error("{0}")]
    Conflict(String),

    #[error("store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) => {
                // PostgreSQL unique violation
                if db_err.code().as_deref() == Some("23505") {
                    return StoreError::Conflict(db_err.message().to_string());
                }
                StoreError::Database(db_err.to_string())
            }
            _ => StoreError::Database(err.to_string()),
        }
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::NotFound
        ));
    }

    #[test]
    fn test_other_errors_keep_their_message() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        match err {
            StoreError::Database(msg) => assert!(msg.contains("timed out")),
            other => panic!("expected Database error, got {other:?}"),
        }
    }
}
