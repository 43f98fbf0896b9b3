use thiserror::Error;

use crate::password::HashingError;
use crate::token::EncodingError;
use crate::token::KeyError;

/// Failures of the service itself, as opposed to refusals of a client.
///
/// Client-driven outcomes are always an `AuthResult`; these indicate a broken
/// environment or configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Hashing error: {0}")]
    Hashing(#[from] HashingError),

    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Signing key error: {0}")]
    Key(#[from] KeyError),
}
