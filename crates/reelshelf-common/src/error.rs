//! Common error types used throughout reelshelf.
//!
//! The record store surfaces every SQLite, pool and migration failure as
//! [`Error::Database`].

/// Common error type for reelshelf.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A database operation failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl Error {
    /// Create a new Database error.
    pub fn database<S: Into<String>>(msg: S) -> Self {
        Self::Database(msg.into())
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
