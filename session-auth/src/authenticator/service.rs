use std::sync::Arc;

use super::bearer::parse_bearer;
use super::errors::AuthError;
use super::models::AuthResult;
use super::models::Credential;
use super::models::Principal;
use super::models::RejectReason;
use super::models::TokenPair;
use super::ports::CredentialStore;
use crate::clock::Clock;
use crate::config::AuthConfig;
use crate::password::HashingError;
use crate::password::HashingPool;
use crate::password::PasswordHasher;
use crate::password::StoredHash;
use crate::token::EncodingError;
use crate::token::KeyRing;
use crate::token::KeyStore;
use crate::token::RefreshError;
use crate::token::SigningKey;
use crate::token::TokenCodec;
use crate::token::TokenError;
use crate::token::TokenIssuer;
use crate::token::TokenType;

// Hashed once at startup. Unknown identifiers are verified against it so they
// cost the same as a wrong secret for a known identifier.
const DECOY_SECRET: &str = "decoy-secret-for-unknown-identifiers";

/// Result of looking up the identifier, before the secret is checked.
enum Lookup {
    Found(StoredHash),
    Missing(RejectReason),
}

/// A login whose secret has not been checked yet.
struct Pending<'a> {
    identifier: &'a str,
}

/// A login whose secret matched; only tokens remain to be issued.
struct CredentialChecked {
    subject: String,
}

impl<'a> Pending<'a> {
    fn check_credential(
        self,
        lookup: &Lookup,
        secret_matches: bool,
    ) -> Result<CredentialChecked, RejectReason> {
        match lookup {
            Lookup::Missing(reason) => Err(*reason),
            Lookup::Found(_) if secret_matches => Ok(CredentialChecked {
                subject: self.identifier.to_string(),
            }),
            Lookup::Found(_) => Err(RejectReason::BadCredential),
        }
    }
}

impl CredentialChecked {
    fn issue_tokens(self, tokens: TokenPair) -> AuthResult {
        AuthResult::Authenticated {
            principal: Principal {
                subject: self.subject,
                token_type: TokenType::Access,
            },
            tokens: Some(tokens),
        }
    }
}

/// Authentication façade: password login, token checks, refresh and key
/// rotation.
///
/// Holds no per-request state; one instance serves concurrent requests.
pub struct AuthenticationService<S>
where
    S: CredentialStore,
{
    store: Arc<S>,
    hashing: HashingPool,
    codec: TokenCodec,
    issuer: TokenIssuer,
    keys: Arc<KeyStore>,
    clock: Arc<dyn Clock>,
    grace_period_secs: i64,
    decoy: StoredHash,
}

impl<S> AuthenticationService<S>
where
    S: CredentialStore,
{
    /// Create a service whose initial signing key comes from the configuration.
    ///
    /// # Errors
    /// * `Key` - The configured signing key is unusable
    /// * `Hashing` - Hashing parameters are invalid or the RNG failed
    pub fn from_config(
        store: Arc<S>,
        config: &AuthConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AuthError> {
        let key = config.signing.signing_key()?;
        let keys = Arc::new(KeyStore::new(KeyRing::new(key)));
        Self::new(store, keys, clock, config)
    }

    /// Create a service with injected dependencies.
    ///
    /// # Arguments
    /// * `store` - Credential store used at login
    /// * `keys` - Shared key store, possibly also rotated elsewhere
    /// * `clock` - Time source for issuance and verification
    /// * `config` - Token lifetimes, hashing cost and rotation grace period
    ///
    /// # Errors
    /// * `Hashing` - Hashing parameters are invalid or the RNG failed
    pub fn new(
        store: Arc<S>,
        keys: Arc<KeyStore>,
        clock: Arc<dyn Clock>,
        config: &AuthConfig,
    ) -> Result<Self, AuthError> {
        let hasher = PasswordHasher::new(config.hashing.cost())?;
        let decoy = hasher.hash(DECOY_SECRET)?;
        let hashing = HashingPool::new(
            hasher,
            config.hashing.max_concurrent,
            config.hashing.timeout(),
        );
        let issuer = TokenIssuer::new(
            Arc::clone(&keys),
            Arc::clone(&clock),
            config.tokens.access_ttl(),
            config.tokens.refresh_ttl(),
        );

        Ok(Self {
            store,
            hashing,
            codec: TokenCodec::new(),
            issuer,
            keys,
            clock,
            grace_period_secs: config.signing.grace_period_secs,
            decoy,
        })
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn keys(&self) -> &Arc<KeyStore> {
        &self.keys
    }

    /// Hash a secret for storage at registration time.
    ///
    /// # Errors
    /// * `HashingError` - RNG failure, timeout, or worker failure
    pub async fn hash_secret(&self, secret: &str) -> Result<StoredHash, HashingError> {
        self.hashing.hash(secret).await
    }

    /// Whether a stored hash was produced with outdated parameters.
    pub fn needs_rehash(&self, stored: &StoredHash) -> bool {
        self.hashing.hasher().needs_rehash(stored)
    }

    /// Verify a credential and issue access and refresh tokens.
    ///
    /// Unknown identifiers, store failures and wrong secrets all go through
    /// one password verification and produce a rejection with the same
    /// public shape.
    ///
    /// # Arguments
    /// * `credential` - Submitted identifier and secret
    ///
    /// # Returns
    /// `Authenticated` with a token pair, or `Rejected`
    ///
    /// # Errors
    /// * `Hashing` - Verification timed out or the worker failed
    /// * `Encoding` - Tokens could not be signed
    pub async fn login(&self, credential: &Credential) -> Result<AuthResult, AuthError> {
        let identifier = credential.identifier();
        let pending = Pending { identifier };

        let lookup = match self.store.lookup(identifier).await {
            Ok(Some(stored)) => Lookup::Found(stored),
            Ok(None) => Lookup::Missing(RejectReason::UnknownIdentifier),
            Err(e) => {
                tracing::warn!(
                    identifier = %identifier,
                    error = %e,
                    "Credential store lookup failed"
                );
                Lookup::Missing(RejectReason::LookupFailed)
            }
        };

        let candidate = match &lookup {
            Lookup::Found(stored) => stored,
            Lookup::Missing(_) => &self.decoy,
        };
        let secret_matches = self.hashing.verify(credential.secret(), candidate).await?;

        let checked = match pending.check_credential(&lookup, secret_matches) {
            Ok(checked) => checked,
            Err(reason) => {
                tracing::warn!(identifier = %identifier, reason = %reason, "Login rejected");
                return Ok(AuthResult::Rejected(reason));
            }
        };

        let tokens = self.issue_pair(&checked.subject)?;
        tracing::info!(subject = %checked.subject, "Login succeeded");

        Ok(checked.issue_tokens(tokens))
    }

    /// Authenticate a request by its access token.
    ///
    /// Refresh tokens are refused here even when valid.
    pub fn authenticate(&self, token: &str) -> AuthResult {
        let now = self.clock.timestamp();

        match self.codec.decode(token, &self.keys.snapshot(), now) {
            Ok(claims) if claims.token_type() == TokenType::Access => AuthResult::Authenticated {
                principal: Principal {
                    subject: claims.subject().to_string(),
                    token_type: claims.token_type(),
                },
                tokens: None,
            },
            Ok(claims) => {
                tracing::warn!(
                    subject = %claims.subject(),
                    token_type = %claims.token_type(),
                    "Non-access token presented for authentication"
                );
                AuthResult::Rejected(RejectReason::WrongTokenType)
            }
            Err(e) => {
                tracing::debug!(reason = %e, "Token rejected");
                AuthResult::Rejected(RejectReason::TokenError(e))
            }
        }
    }

    /// Authenticate a request by its `Authorization` header value.
    ///
    /// A missing header or a non-bearer scheme counts as a malformed token.
    pub fn authenticate_bearer(&self, header_value: Option<&str>) -> AuthResult {
        match header_value.and_then(parse_bearer) {
            Some(token) => self.authenticate(token),
            None => AuthResult::Rejected(RejectReason::TokenError(TokenError::Malformed)),
        }
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// # Errors
    /// * `Encoding` - The new access token could not be signed
    pub fn refresh(&self, refresh_token: &str) -> Result<AuthResult, AuthError> {
        match self.issuer.exchange(refresh_token) {
            Ok((claims, access_token)) => Ok(AuthResult::Authenticated {
                principal: Principal {
                    subject: claims.subject().to_string(),
                    token_type: TokenType::Access,
                },
                tokens: Some(TokenPair {
                    access_token,
                    refresh_token: None,
                    expires_in: self.issuer.access_ttl().num_seconds(),
                }),
            }),
            Err(RefreshError::WrongTokenType) => {
                Ok(AuthResult::Rejected(RejectReason::WrongTokenType))
            }
            Err(RefreshError::Token(e)) => {
                tracing::debug!(reason = %e, "Refresh token rejected");
                Ok(AuthResult::Rejected(RejectReason::TokenError(e)))
            }
            Err(RefreshError::Encoding(e)) => Err(AuthError::Encoding(e)),
        }
    }

    /// Make `key` the signing key; the previous key keeps verifying for the
    /// configured grace period.
    pub fn rotate_signing_key(&self, key: SigningKey) {
        self.keys.rotate(key, self.clock.timestamp(), self.grace_period_secs);
    }

    fn issue_pair(&self, subject: &str) -> Result<TokenPair, EncodingError> {
        let now = self.clock.timestamp();
        let access_token = self
            .issuer
            .issue_access_token(subject, now, self.issuer.access_ttl())?;
        let refresh_token = self
            .issuer
            .issue_refresh_token(subject, now, self.issuer.refresh_ttl())?;

        Ok(TokenPair {
            access_token,
            refresh_token: Some(refresh_token),
            expires_in: self.issuer.access_ttl().num_seconds(),
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Duration;
    use jsonwebtoken::Algorithm;
    use mockall::mock;

    use super::*;
    use crate::authenticator::ports::LookupError;
    use crate::clock::ManualClock;
    use crate::config::HashingConfig;
    use crate::config::SigningConfig;
    use crate::config::TokenConfig;

    mock! {
        pub TestCredentialStore {}

        #[async_trait]
        impl CredentialStore for TestCredentialStore {
            async fn lookup(&self, identifier: &str) -> Result<Option<StoredHash>, LookupError>;
        }
    }

    const NOW: i64 = 1_700_000_000;

    fn config() -> AuthConfig {
        AuthConfig {
            signing: SigningConfig {
                key_id: "primary".to_string(),
                secret: "test_secret_key_at_least_32_bytes!".to_string(),
                algorithm: "HS256".to_string(),
                grace_period_secs: 60,
            },
            tokens: TokenConfig {
                access_ttl_secs: 900,
                refresh_ttl_secs: 86_400,
            },
            hashing: HashingConfig {
                memory_kib: 256,
                iterations: 1,
                parallelism: 1,
                max_concurrent: 2,
                timeout_ms: 30_000,
            },
        }
    }

    fn stored_hash(secret: &str) -> StoredHash {
        PasswordHasher::new(config().hashing.cost())
            .expect("Failed to create hasher")
            .hash(secret)
            .expect("Failed to hash password")
    }

    fn service(
        store: MockTestCredentialStore,
    ) -> (AuthenticationService<MockTestCredentialStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_timestamp(NOW));
        let service = AuthenticationService::from_config(Arc::new(store), &config(), clock.clone())
            .expect("Failed to create service");
        (service, clock)
    }

    #[test]
    fn test_credential_check_transitions() {
        let found = Lookup::Found(StoredHash::from("irrelevant"));
        let missing = Lookup::Missing(RejectReason::UnknownIdentifier);

        let checked = Pending { identifier: "alice" }
            .check_credential(&found, true)
            .expect("Expected credential to be accepted");
        assert_eq!(checked.subject, "alice");

        assert_eq!(
            Pending { identifier: "alice" }
                .check_credential(&found, false)
                .err(),
            Some(RejectReason::BadCredential)
        );
        // A missing identifier is never accepted, even if the decoy matched
        assert_eq!(
            Pending { identifier: "alice" }
                .check_credential(&missing, true)
                .err(),
            Some(RejectReason::UnknownIdentifier)
        );
    }

    #[tokio::test]
    async fn test_login_success() {
        let hash = stored_hash("correct-horse");
        let mut store = MockTestCredentialStore::new();
        store
            .expect_lookup()
            .withf(|identifier| identifier == "alice")
            .times(1)
            .returning(move |_| Ok(Some(hash.clone())));

        let (service, _) = service(store);
        let result = service
            .login(&Credential::new("alice", "correct-horse"))
            .await
            .expect("Login failed");

        let principal = result.principal().expect("Expected principal");
        assert_eq!(principal.subject, "alice");
        assert_eq!(principal.token_type, TokenType::Access);

        let tokens = result.tokens().expect("Expected tokens");
        assert!(tokens.refresh_token.is_some());
        assert_eq!(tokens.expires_in, 900);
    }

    #[tokio::test]
    async fn test_login_wrong_secret() {
        let hash = stored_hash("correct-horse");
        let mut store = MockTestCredentialStore::new();
        store
            .expect_lookup()
            .returning(move |_| Ok(Some(hash.clone())));

        let (service, _) = service(store);
        let result = service
            .login(&Credential::new("alice", "wrong"))
            .await
            .expect("Login failed");

        assert_eq!(result, AuthResult::Rejected(RejectReason::BadCredential));
    }

    #[tokio::test]
    async fn test_login_unknown_identifier() {
        let mut store = MockTestCredentialStore::new();
        store.expect_lookup().returning(|_| Ok(None));

        let (service, _) = service(store);
        let result = service
            .login(&Credential::new("mallory", "anything"))
            .await
            .expect("Login failed");

        assert_eq!(result, AuthResult::Rejected(RejectReason::UnknownIdentifier));
    }

    #[tokio::test]
    async fn test_login_decoy_secret_does_not_authenticate_unknown_identifier() {
        let mut store = MockTestCredentialStore::new();
        store.expect_lookup().returning(|_| Ok(None));

        let (service, _) = service(store);
        let result = service
            .login(&Credential::new("mallory", DECOY_SECRET))
            .await
            .expect("Login failed");

        assert_eq!(result, AuthResult::Rejected(RejectReason::UnknownIdentifier));
    }

    #[tokio::test]
    async fn test_login_store_failure_is_rejected() {
        let mut store = MockTestCredentialStore::new();
        store
            .expect_lookup()
            .returning(|_| Err(LookupError("connection refused".to_string())));

        let (service, _) = service(store);
        let result = service
            .login(&Credential::new("alice", "correct-horse"))
            .await
            .expect("Login failed");

        assert_eq!(result, AuthResult::Rejected(RejectReason::LookupFailed));
    }

    #[tokio::test]
    async fn test_login_malformed_stored_hash_is_rejected() {
        let mut store = MockTestCredentialStore::new();
        store
            .expect_lookup()
            .returning(|_| Ok(Some(StoredHash::from("not-a-hash"))));

        let (service, _) = service(store);
        let result = service
            .login(&Credential::new("alice", "correct-horse"))
            .await
            .expect("Login failed");

        assert_eq!(result, AuthResult::Rejected(RejectReason::BadCredential));
    }

    #[tokio::test]
    async fn test_authenticate_access_token() {
        let (service, _) = service(MockTestCredentialStore::new());
        let token = service
            .issuer()
            .issue_access_token("alice", NOW, Duration::minutes(15))
            .expect("Failed to issue token");

        let result = service.authenticate(token.as_str());
        assert_eq!(
            result,
            AuthResult::Authenticated {
                principal: Principal {
                    subject: "alice".to_string(),
                    token_type: TokenType::Access,
                },
                tokens: None,
            }
        );
    }

    #[tokio::test]
    async fn test_authenticate_rejects_refresh_token() {
        let (service, _) = service(MockTestCredentialStore::new());
        let token = service
            .issuer()
            .issue_refresh_token("alice", NOW, Duration::days(1))
            .expect("Failed to issue token");

        assert_eq!(
            service.authenticate(token.as_str()),
            AuthResult::Rejected(RejectReason::WrongTokenType)
        );
    }

    #[tokio::test]
    async fn test_authenticate_bearer_header() {
        let (service, _) = service(MockTestCredentialStore::new());
        let token = service
            .issuer()
            .issue_access_token("alice", NOW, Duration::minutes(15))
            .expect("Failed to issue token");

        let header = format!("Bearer {}", token.as_str());
        assert!(service.authenticate_bearer(Some(&header)).is_authenticated());
        assert_eq!(
            service.authenticate_bearer(None),
            AuthResult::Rejected(RejectReason::TokenError(TokenError::Malformed))
        );
        assert_eq!(
            service.authenticate_bearer(Some("Basic YWxpY2U6c2VjcmV0")),
            AuthResult::Rejected(RejectReason::TokenError(TokenError::Malformed))
        );
    }

    #[tokio::test]
    async fn test_refresh_returns_new_access_token() {
        let (service, clock) = service(MockTestCredentialStore::new());
        let refresh = service
            .issuer()
            .issue_refresh_token("alice", NOW, Duration::days(1))
            .expect("Failed to issue token");

        clock.advance(Duration::minutes(30));
        let result = service.refresh(refresh.as_str()).expect("Refresh failed");

        let tokens = result.tokens().expect("Expected tokens");
        assert!(tokens.refresh_token.is_none());
        assert!(service
            .authenticate(tokens.access_token.as_str())
            .is_authenticated());
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let (service, _) = service(MockTestCredentialStore::new());
        let access = service
            .issuer()
            .issue_access_token("alice", NOW, Duration::minutes(15))
            .expect("Failed to issue token");

        assert_eq!(
            service.refresh(access.as_str()).expect("Refresh failed"),
            AuthResult::Rejected(RejectReason::WrongTokenType)
        );
    }

    #[tokio::test]
    async fn test_rotation_uses_configured_grace_period() {
        let (service, clock) = service(MockTestCredentialStore::new());
        let token = service
            .issuer()
            .issue_access_token("alice", NOW, Duration::minutes(15))
            .expect("Failed to issue token");

        service.rotate_signing_key(
            SigningKey::hmac("next", b"next_secret_at_least_32_bytes_long!!", Algorithm::HS256)
                .expect("Failed to create key"),
        );

        clock.advance(Duration::seconds(59));
        assert!(service.authenticate(token.as_str()).is_authenticated());

        clock.advance(Duration::seconds(1));
        assert_eq!(
            service.authenticate(token.as_str()),
            AuthResult::Rejected(RejectReason::TokenError(TokenError::SignatureInvalid))
        );
    }

    #[tokio::test]
    async fn test_hash_secret_and_needs_rehash() {
        let (service, _) = service(MockTestCredentialStore::new());

        let hash = service
            .hash_secret("correct-horse")
            .await
            .expect("Failed to hash password");

        assert!(!service.needs_rehash(&hash));
        assert!(service.needs_rehash(&StoredHash::from("garbage")));
    }
}
