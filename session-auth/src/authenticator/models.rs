use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::token::Token;
use crate::token::TokenError;
use crate::token::TokenType;

/// Message shown to clients for every rejection, whatever the reason.
pub const PUBLIC_REJECTION_MESSAGE: &str = "authentication failed";

/// Identifier and plaintext secret submitted at login.
///
/// Only lives for the duration of a login; `Debug` omits the secret.
#[derive(Clone)]
pub struct Credential {
    identifier: String,
    secret: String,
}

impl Credential {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub(crate) fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
    pub token_type: TokenType,
}

/// Tokens handed to a client after login or refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: Token,
    pub refresh_token: Option<Token>,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// OAuth2 password-flow token response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub token_type: &'static str,
    pub expires_in: i64,
}

impl TokenPair {
    pub fn to_response(&self) -> TokenResponse {
        TokenResponse {
            access_token: self.access_token.as_str().to_string(),
            refresh_token: self
                .refresh_token
                .as_ref()
                .map(|token| token.as_str().to_string()),
            token_type: "bearer",
            expires_in: self.expires_in,
        }
    }
}

/// Why a request was refused.
///
/// For logs and metrics only. Clients get [`RejectReason::public_message`],
/// which is the same for every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("Unknown identifier")]
    UnknownIdentifier,

    #[error("Bad credential")]
    BadCredential,

    #[error("Credential lookup failed")]
    LookupFailed,

    #[error("Wrong token type")]
    WrongTokenType,

    #[error("Token rejected: {0}")]
    TokenError(TokenError),
}

impl RejectReason {
    pub fn public_message(&self) -> &'static str {
        PUBLIC_REJECTION_MESSAGE
    }
}

impl From<TokenError> for RejectReason {
    fn from(error: TokenError) -> Self {
        RejectReason::TokenError(error)
    }
}

/// Outcome of a login, token check or refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    Authenticated {
        principal: Principal,
        /// Present for login and refresh; absent when a token was checked
        tokens: Option<TokenPair>,
    },
    Rejected(RejectReason),
}

impl AuthResult {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthResult::Authenticated { .. })
    }

    pub fn principal(&self) -> Option<&Principal> {
        match self {
            AuthResult::Authenticated { principal, .. } => Some(principal),
            AuthResult::Rejected(_) => None,
        }
    }

    pub fn tokens(&self) -> Option<&TokenPair> {
        match self {
            AuthResult::Authenticated { tokens, .. } => tokens.as_ref(),
            AuthResult::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<RejectReason> {
        match self {
            AuthResult::Authenticated { .. } => None,
            AuthResult::Rejected(reason) => Some(*reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_debug_hides_secret() {
        let credential = Credential::new("alice", "correct-horse");
        let rendered = format!("{credential:?}");

        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("correct-horse"));
    }

    #[test]
    fn test_public_message_is_uniform() {
        let reasons = [
            RejectReason::UnknownIdentifier,
            RejectReason::BadCredential,
            RejectReason::LookupFailed,
            RejectReason::WrongTokenType,
            RejectReason::TokenError(TokenError::Expired),
        ];

        for reason in reasons {
            assert_eq!(reason.public_message(), PUBLIC_REJECTION_MESSAGE);
        }
    }

    #[test]
    fn test_token_response_shape() {
        let pair = TokenPair {
            access_token: Token::from("a.b.c".to_string()),
            refresh_token: None,
            expires_in: 900,
        };

        let json = serde_json::to_value(pair.to_response()).expect("Failed to serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "access_token": "a.b.c",
                "token_type": "bearer",
                "expires_in": 900
            })
        );
    }
}
