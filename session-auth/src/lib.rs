//! Credential verification and session tokens
//!
//! Provides the authentication core of a service:
//! - Password hashing (Argon2id) on a bounded worker pool
//! - Signed, time-bounded access and refresh tokens
//! - Signing key rotation with a grace period for retired keys
//! - An authentication service tying them to an external credential store
//!
//! HTTP routing, request parsing and user persistence live outside this crate;
//! the store is reached through the [`CredentialStore`] port.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use session_auth::{HashCost, PasswordHasher};
//!
//! let hasher = PasswordHasher::new(HashCost { memory_kib: 256, iterations: 1, parallelism: 1 }).unwrap();
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.verify("my_password", &hash));
//! ```
//!
//! ## Tokens
//! ```
//! use jsonwebtoken::Algorithm;
//! use session_auth::{ClaimSet, KeyRing, SigningKey, TokenCodec, TokenType};
//!
//! let key = SigningKey::hmac("primary", b"secret_key_at_least_32_bytes_long!", Algorithm::HS256).unwrap();
//! let ring = KeyRing::new(key);
//! let codec = TokenCodec::new();
//!
//! let claims = ClaimSet::new("user123", TokenType::Access, 1_000, 2_000);
//! let token = codec.encode(&claims, ring.current()).unwrap();
//! let decoded = codec.decode(token.as_str(), &ring, 1_500).unwrap();
//! assert_eq!(decoded, claims);
//! ```

pub mod authenticator;
pub mod clock;
pub mod config;
pub mod password;
pub mod token;

// Re-export commonly used items
pub use authenticator::AuthError;
pub use authenticator::AuthResult;
pub use authenticator::AuthenticationService;
pub use authenticator::Credential;
pub use authenticator::CredentialStore;
pub use authenticator::LookupError;
pub use authenticator::Principal;
pub use authenticator::RejectReason;
pub use authenticator::TokenPair;
pub use clock::Clock;
pub use clock::ManualClock;
pub use clock::SystemClock;
pub use config::AuthConfig;
pub use password::HashCost;
pub use password::HashingError;
pub use password::HashingPool;
pub use password::PasswordHasher;
pub use password::StoredHash;
pub use token::ClaimSet;
pub use token::ClaimValue;
pub use token::EncodingError;
pub use token::KeyRing;
pub use token::KeyStore;
pub use token::RefreshError;
pub use token::SigningKey;
pub use token::Token;
pub use token::TokenCodec;
pub use token::TokenError;
pub use token::TokenIssuer;
pub use token::TokenType;
