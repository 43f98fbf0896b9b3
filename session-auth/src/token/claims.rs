use std::collections::BTreeMap;
use std::fmt;

use chrono::Duration;
use serde::Deserialize;
use serde::Serialize;

use super::errors::EncodingError;

/// Claim names owned by [`ClaimSet`] itself; extra claims may not reuse them.
pub const RESERVED_CLAIMS: [&str; 4] = ["sub", "iat", "exp", "type"];

/// Class of a token.
///
/// Access tokens authenticate ordinary requests; refresh tokens can only be
/// exchanged for a new access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primitive value allowed in an extra claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<bool> for ClaimValue {
    fn from(value: bool) -> Self {
        ClaimValue::Bool(value)
    }
}

impl From<i64> for ClaimValue {
    fn from(value: i64) -> Self {
        ClaimValue::Integer(value)
    }
}

impl From<i32> for ClaimValue {
    fn from(value: i32) -> Self {
        ClaimValue::Integer(value.into())
    }
}

impl From<f64> for ClaimValue {
    fn from(value: f64) -> Self {
        ClaimValue::Float(value)
    }
}

impl From<String> for ClaimValue {
    fn from(value: String) -> Self {
        ClaimValue::Text(value)
    }
}

impl From<&str> for ClaimValue {
    fn from(value: &str) -> Self {
        ClaimValue::Text(value.to_string())
    }
}

/// Claims carried by a token.
///
/// Serialized as `{"sub", "iat", "exp", "type", ...extra}` with timestamps in
/// Unix seconds. There are no setters; extra claims are attached while
/// building with [`ClaimSet::with_claim`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSet {
    #[serde(rename = "sub")]
    subject: String,

    #[serde(rename = "iat")]
    issued_at: i64,

    #[serde(rename = "exp")]
    expires_at: i64,

    #[serde(rename = "type")]
    token_type: TokenType,

    #[serde(flatten)]
    extra: BTreeMap<String, ClaimValue>,
}

impl ClaimSet {
    /// Create claims with explicit timestamps.
    ///
    /// The lifetime is checked when the claims are encoded.
    pub fn new(
        subject: impl Into<String>,
        token_type: TokenType,
        issued_at: i64,
        expires_at: i64,
    ) -> Self {
        Self {
            subject: subject.into(),
            issued_at,
            expires_at,
            token_type,
            extra: BTreeMap::new(),
        }
    }

    /// Create claims that expire `ttl` after `now`.
    ///
    /// # Arguments
    /// * `subject` - Principal the token is issued to
    /// * `token_type` - Access or refresh
    /// * `now` - Issue time (Unix seconds)
    /// * `ttl` - Lifetime, truncated to whole seconds
    pub fn for_subject(
        subject: impl Into<String>,
        token_type: TokenType,
        now: i64,
        ttl: Duration,
    ) -> Self {
        Self::new(
            subject,
            token_type,
            now,
            now.saturating_add(ttl.num_seconds()),
        )
    }

    /// Attach an extra claim.
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<ClaimValue>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn issued_at(&self) -> i64 {
        self.issued_at
    }

    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    pub fn token_type(&self) -> TokenType {
        self.token_type
    }

    pub fn extra(&self) -> &BTreeMap<String, ClaimValue> {
        &self.extra
    }

    pub fn claim(&self, name: &str) -> Option<&ClaimValue> {
        self.extra.get(name)
    }

    /// Check if the token is expired at `now`.
    ///
    /// A token is valid strictly before its expiry second.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at <= now
    }

    /// Check the claims can be encoded.
    ///
    /// # Errors
    /// * `InvalidLifetime` - `exp` is not after `iat`
    /// * `ReservedClaim` - An extra claim shadows a core claim
    /// * `NonFiniteClaim` - An extra float claim is NaN or infinite
    pub fn validate(&self) -> Result<(), EncodingError> {
        if self.expires_at <= self.issued_at {
            return Err(EncodingError::InvalidLifetime {
                issued_at: self.issued_at,
                expires_at: self.expires_at,
            });
        }

        for (name, value) in &self.extra {
            if RESERVED_CLAIMS.contains(&name.as_str()) {
                return Err(EncodingError::ReservedClaim(name.clone()));
            }
            if let ClaimValue::Float(number) = value {
                if !number.is_finite() {
                    return Err(EncodingError::NonFiniteClaim(name.clone()));
                }
            }
        }

        Ok(())
    }
}
