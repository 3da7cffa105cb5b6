//! Common error types for Tweet Race

use thiserror::Error;

/// Common result type for Tweet Race operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the Tweet Race processes
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Value rejected before it reached the database
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Errors worth a fresh connection and one more attempt.
    ///
    /// Rejected values are not: the same row would be rejected again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_and_io_errors_are_transient() {
        assert!(Error::Database(sqlx::Error::PoolClosed).is_transient());
        assert!(Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "reset")).is_transient());
    }

    #[test]
    fn test_value_errors_are_not_transient() {
        assert!(!Error::InvalidInput("NUL in text".to_string()).is_transient());
        assert!(!Error::Config("bad".to_string()).is_transient());
    }
}
