use std::sync::Arc;

use chrono::Duration;

use super::claims::ClaimSet;
use super::claims::TokenType;
use super::codec::Token;
use super::codec::TokenCodec;
use super::errors::EncodingError;
use super::errors::RefreshError;
use super::errors::TokenError;
use super::keys::KeyStore;
use crate::clock::Clock;

/// Builds claims for access and refresh tokens and signs them with the
/// current key.
pub struct TokenIssuer {
    codec: TokenCodec,
    keys: Arc<KeyStore>,
    clock: Arc<dyn Clock>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    /// Create a token issuer.
    ///
    /// # Arguments
    /// * `keys` - Shared key store; the current key signs, the ring verifies
    /// * `clock` - Time source for refresh exchanges and verification
    /// * `access_ttl` - Lifetime of access tokens minted by [`TokenIssuer::refresh`]
    /// * `refresh_ttl` - Lifetime of refresh tokens
    pub fn new(
        keys: Arc<KeyStore>,
        clock: Arc<dyn Clock>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            codec: TokenCodec::new(),
            keys,
            clock,
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Issue an access token for `subject` valid from `now` for `ttl`.
    ///
    /// # Errors
    /// * `InvalidLifetime` - `ttl` is shorter than one second
    /// * `Signing` - Signing failed
    pub fn issue_access_token(
        &self,
        subject: &str,
        now: i64,
        ttl: Duration,
    ) -> Result<Token, EncodingError> {
        self.issue(ClaimSet::for_subject(subject, TokenType::Access, now, ttl))
    }

    /// Issue a refresh token for `subject` valid from `now` for `ttl`.
    ///
    /// # Errors
    /// * `InvalidLifetime` - `ttl` is shorter than one second
    /// * `Signing` - Signing failed
    pub fn issue_refresh_token(
        &self,
        subject: &str,
        now: i64,
        ttl: Duration,
    ) -> Result<Token, EncodingError> {
        self.issue(ClaimSet::for_subject(subject, TokenType::Refresh, now, ttl))
    }

    /// Sign arbitrary claims with the current key.
    pub fn issue(&self, claims: ClaimSet) -> Result<Token, EncodingError> {
        let ring = self.keys.snapshot();
        let token = self.codec.encode(&claims, ring.current())?;

        tracing::debug!(
            subject = %claims.subject(),
            token_type = %claims.token_type(),
            expires_at = claims.expires_at(),
            key_id = %ring.current().id(),
            "Token issued"
        );

        Ok(token)
    }

    /// Verify a token against the current key ring at the clock's time.
    pub fn verify(&self, token: &str) -> Result<ClaimSet, TokenError> {
        self.codec
            .decode(token, &self.keys.snapshot(), self.clock.timestamp())
    }

    /// Exchange a refresh token for a new access token for the same subject.
    ///
    /// The token type is checked after full verification; a valid access
    /// token is refused even though its signature and expiry are fine.
    ///
    /// # Errors
    /// * `WrongTokenType` - Token is valid but not a refresh token
    /// * `Token` - Token failed verification
    /// * `Encoding` - The new access token could not be signed
    pub fn refresh(&self, refresh_token: &str) -> Result<Token, RefreshError> {
        self.exchange(refresh_token).map(|(_, token)| token)
    }

    /// Like [`TokenIssuer::refresh`], also returning the verified refresh claims.
    pub(crate) fn exchange(&self, refresh_token: &str) -> Result<(ClaimSet, Token), RefreshError> {
        let now = self.clock.timestamp();
        let claims = self
            .codec
            .decode(refresh_token, &self.keys.snapshot(), now)?;

        if claims.token_type() != TokenType::Refresh {
            tracing::warn!(
                subject = %claims.subject(),
                token_type = %claims.token_type(),
                "Refresh attempted with non-refresh token"
            );
            return Err(RefreshError::WrongTokenType);
        }

        let access = self.issue_access_token(claims.subject(), now, self.access_ttl)?;
        Ok((claims, access))
    }
}
