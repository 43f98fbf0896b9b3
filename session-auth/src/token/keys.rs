use std::fmt;
use std::iter;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;

use super::errors::KeyError;

/// Minimum secret length for HMAC signing keys (256 bits).
pub const MIN_SECRET_LEN: usize = 32;

/// Parse a signing algorithm name.
///
/// Only the HMAC-SHA2 family is accepted.
pub fn parse_algorithm(name: &str) -> Result<Algorithm, KeyError> {
    match name {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(KeyError::UnsupportedAlgorithm(other.to_string())),
    }
}

/// Secret used to sign and verify tokens.
///
/// The key material is never printed; `Debug` shows the id and algorithm only.
pub struct SigningKey {
    id: String,
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKey {
    /// Create an HMAC signing key.
    ///
    /// # Arguments
    /// * `id` - Identifier used in logs when the key is rotated
    /// * `secret` - Key material, at least [`MIN_SECRET_LEN`] bytes
    /// * `algorithm` - One of HS256, HS384, HS512
    ///
    /// # Errors
    /// * `SecretTooShort` - Secret is shorter than 32 bytes
    /// * `UnsupportedAlgorithm` - Algorithm is not an HMAC algorithm
    pub fn hmac(
        id: impl Into<String>,
        secret: &[u8],
        algorithm: Algorithm,
    ) -> Result<Self, KeyError> {
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(KeyError::UnsupportedAlgorithm(format!("{algorithm:?}")));
        }
        if secret.len() < MIN_SECRET_LEN {
            return Err(KeyError::SecretTooShort {
                min: MIN_SECRET_LEN,
                actual: secret.len(),
            });
        }

        Ok(Self {
            id: id.into(),
            algorithm,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("id", &self.id)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
struct RetiredKey {
    key: Arc<SigningKey>,
    /// Unix second from which the key no longer verifies
    verify_until: i64,
}

/// Immutable set of keys: the current signing key plus retired keys that
/// still verify until their grace period ends.
#[derive(Debug, Clone)]
pub struct KeyRing {
    current: Arc<SigningKey>,
    retired: Vec<RetiredKey>,
}

impl KeyRing {
    pub fn new(current: SigningKey) -> Self {
        Self {
            current: Arc::new(current),
            retired: Vec::new(),
        }
    }

    /// Key used to sign new tokens.
    pub fn current(&self) -> &SigningKey {
        &self.current
    }

    /// Build the ring that results from making `next` the signing key.
    ///
    /// The previous signing key keeps verifying for `grace_period_secs` after
    /// `now`. Retired keys whose window has already closed are dropped.
    pub fn rotated(&self, next: SigningKey, now: i64, grace_period_secs: i64) -> KeyRing {
        let mut retired = Vec::with_capacity(self.retired.len() + 1);
        retired.push(RetiredKey {
            key: Arc::clone(&self.current),
            verify_until: now.saturating_add(grace_period_secs.max(0)),
        });
        retired.extend(
            self.retired
                .iter()
                .filter(|retired| retired.verify_until > now)
                .cloned(),
        );

        KeyRing {
            current: Arc::new(next),
            retired,
        }
    }

    /// Keys a token may be verified with at `now`, current key first.
    pub fn verification_keys(&self, now: i64) -> impl Iterator<Item = &SigningKey> {
        iter::once(self.current.as_ref()).chain(
            self.retired
                .iter()
                .filter(move |retired| retired.verify_until > now)
                .map(|retired| retired.key.as_ref()),
        )
    }

    /// Ids of retired keys still held, most recently retired first.
    pub fn retired_key_ids(&self) -> Vec<&str> {
        self.retired.iter().map(|retired| retired.key.id()).collect()
    }
}

/// Shared holder of the active [`KeyRing`].
///
/// Readers take a snapshot (an `Arc` clone under a short read lock) and
/// verify against it without holding the lock. Rotation swaps in a new
/// snapshot; tokens already being verified keep using the old one.
#[derive(Debug)]
pub struct KeyStore {
    ring: RwLock<Arc<KeyRing>>,
}

impl KeyStore {
    pub fn new(ring: KeyRing) -> Self {
        Self {
            ring: RwLock::new(Arc::new(ring)),
        }
    }

    pub fn snapshot(&self) -> Arc<KeyRing> {
        Arc::clone(&self.ring.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Make `next` the signing key.
    ///
    /// # Returns
    /// The ring now in effect
    pub fn rotate(&self, next: SigningKey, now: i64, grace_period_secs: i64) -> Arc<KeyRing> {
        let mut ring = self.ring.write().unwrap_or_else(PoisonError::into_inner);
        let previous_id = ring.current().id().to_string();
        let rotated = Arc::new(ring.rotated(next, now, grace_period_secs));
        *ring = Arc::clone(&rotated);

        tracing::info!(
            key_id = %rotated.current().id(),
            retired_key_id = %previous_id,
            grace_period_secs,
            "Signing key rotated"
        );

        rotated
    }
}
