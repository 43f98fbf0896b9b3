use std::time::Duration;

use thiserror::Error;

/// Error type for password hashing.
///
/// Verification never produces one of these for a bad secret or a bad stored
/// hash; it answers `false` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HashingError {
    #[error("Entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("Invalid hashing parameters: {0}")]
    InvalidParameters(String),

    #[error("Hashing did not finish within {0:?}")]
    Timeout(Duration),

    #[error("Hashing worker failed: {0}")]
    WorkerFailed(String),
}

/// A stored hash string that does not follow the expected layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed stored hash: {0}")]
pub struct MalformedHash(pub(crate) &'static str);
