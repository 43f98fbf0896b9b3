use thiserror::Error;

/// Reasons a presented token is refused.
///
/// Checked in declaration order of the decode pipeline: structure, algorithm,
/// signature, then expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Token is malformed")]
    Malformed,

    #[error("Token signature is invalid")]
    SignatureInvalid,

    #[error("Token is expired")]
    Expired,

    #[error("Token algorithm is not supported")]
    UnsupportedAlgorithm,
}

/// Error type for token encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("Extra claim uses a reserved name: {0}")]
    ReservedClaim(String),

    #[error("Extra claim is not a finite number: {0}")]
    NonFiniteClaim(String),

    #[error("Token must expire after it is issued (iat={issued_at}, exp={expires_at})")]
    InvalidLifetime { issued_at: i64, expires_at: i64 },

    #[error("Failed to serialize token segment: {0}")]
    Serialization(String),

    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// Error type for exchanging a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RefreshError {
    #[error("Token is not a refresh token")]
    WrongTokenType,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// Error type for signing key construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("Signing secret too short: minimum {min} bytes, got {actual}")]
    SecretTooShort { min: usize, actual: usize },

    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),
}
