//! Error types for session store operations.

/// Error type for session store operations.
///
/// Lookup of an unknown, removed or evicted id is the only failure the
/// registry reports; every other operation is total.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// No live session exists for the given id.
    #[error("Session not found: {0}")]
    NotFound(String),
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, Error>;
