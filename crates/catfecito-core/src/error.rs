//! Storage Error Types

use thiserror::Error;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by a [`ShopStore`](crate::store::ShopStore) backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend failed to run a query
    #[error("Database error: {0}")]
    Database(String),

    /// A stored value could not be mapped onto the domain model
    #[error("Data corruption: {0}")]
    DataCorruption(String),
}

impl StoreError {
    /// Check if the operation may succeed when retried
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}
