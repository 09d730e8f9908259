//! Error types for the persistence boundary

use thiserror::Error;

/// Failure reported by a [`KeyValueStore`](crate::services::KeyValueStore) backend.
///
/// The countdown and the session never propagate these; they log them and keep
/// running on in-memory state.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
