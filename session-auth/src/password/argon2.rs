use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::rand_core::RngCore;
use argon2::password_hash::Output;
use argon2::Algorithm;
use argon2::Argon2;
use argon2::Params;
use argon2::Version;

use super::errors::HashingError;
use super::stored_hash::HashCost;
use super::stored_hash::StoredHash;

const SALT_LEN: usize = 16;
const OUTPUT_LEN: usize = 32;

/// Stored hashes whose cost exceeds the configured cost by more than this
/// factor in any parameter are not computed.
pub const MAX_COST_FACTOR: u32 = 4;

// Salt for the throwaway computation performed when a stored hash cannot be
// parsed, so that rejection costs the same as a real mismatch.
const DECOY_SALT: [u8; SALT_LEN] = [0x5a; SALT_LEN];

/// Password hashing implementation.
///
/// Argon2id with a fresh random salt per hash and a configured cost.
/// Verification recomputes the digest with the salt and cost embedded in the
/// stored value and compares the two in constant time.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: HashCost,
    params: Params,
}

impl PasswordHasher {
    /// Create a password hasher for the given cost.
    ///
    /// # Arguments
    /// * `cost` - Argon2 memory, iteration and parallelism parameters
    ///
    /// # Errors
    /// * `InvalidParameters` - Argon2 refuses the combination of parameters
    pub fn new(cost: HashCost) -> Result<Self, HashingError> {
        let params = params_for(&cost)?;
        Ok(Self { cost, params })
    }

    /// Cost applied to newly produced hashes.
    pub fn cost(&self) -> HashCost {
        self.cost
    }

    /// Hash a plaintext secret.
    ///
    /// Two calls with the same secret produce different stored hashes.
    ///
    /// # Arguments
    /// * `secret` - Plaintext secret to hash
    ///
    /// # Returns
    /// Stored hash embedding algorithm, cost, salt and digest
    ///
    /// # Errors
    /// * `EntropyUnavailable` - The operating system RNG failed
    /// * `InvalidParameters` - Argon2 rejected the computation
    pub fn hash(&self, secret: &str) -> Result<StoredHash, HashingError> {
        let mut salt = [0u8; SALT_LEN];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| HashingError::EntropyUnavailable(e.to_string()))?;

        let digest = compute(secret, &salt, self.params.clone())
            .map_err(|e| HashingError::InvalidParameters(e.to_string()))?;

        Ok(StoredHash::from_parts(self.cost, &salt, &digest))
    }

    /// Verify a plaintext secret against a stored hash.
    ///
    /// # Arguments
    /// * `secret` - Plaintext secret to verify
    /// * `stored` - Hash previously produced by [`PasswordHasher::hash`]
    ///
    /// # Returns
    /// True if the secret matches; false for a mismatch, for a stored value
    /// that cannot be interpreted, or for one whose cost is more than
    /// [`MAX_COST_FACTOR`] times the configured cost
    pub fn verify(&self, secret: &str, stored: &StoredHash) -> bool {
        let parts = match stored.parts() {
            Ok(parts) => parts,
            Err(e) => {
                tracing::debug!(error = %e, "Stored hash could not be parsed");
                let _ = compute(secret, &DECOY_SALT, self.params.clone());
                return false;
            }
        };

        if !parts.cost.within(&self.cost, MAX_COST_FACTOR) {
            tracing::warn!(
                stored_cost = %parts.cost,
                configured_cost = %self.cost,
                "Stored hash cost exceeds the accepted range"
            );
            let _ = compute(secret, &DECOY_SALT, self.params.clone());
            return false;
        }

        let Ok(params) = params_for(&parts.cost) else {
            let _ = compute(secret, &DECOY_SALT, self.params.clone());
            return false;
        };

        let Ok(digest) = compute_len(secret, &parts.salt, params, parts.digest.len()) else {
            return false;
        };

        match Output::new(&digest) {
            Ok(candidate) => candidate == parts.digest,
            Err(_) => false,
        }
    }

    /// Whether a stored hash should be recomputed with the current cost.
    ///
    /// Malformed values always need rehashing.
    pub fn needs_rehash(&self, stored: &StoredHash) -> bool {
        stored
            .parts()
            .map(|parts| parts.cost != self.cost || parts.digest.len() != OUTPUT_LEN)
            .unwrap_or(true)
    }
}

fn params_for(cost: &HashCost) -> Result<Params, HashingError> {
    Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
        .map_err(|e| HashingError::InvalidParameters(e.to_string()))
}

fn compute(secret: &str, salt: &[u8], params: Params) -> Result<Vec<u8>, argon2::Error> {
    compute_len(secret, salt, params, OUTPUT_LEN)
}

fn compute_len(
    secret: &str,
    salt: &[u8],
    params: Params,
    output_len: usize,
) -> Result<Vec<u8>, argon2::Error> {
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut digest = vec![0u8; output_len];
    argon2.hash_password_into(secret.as_bytes(), salt, &mut digest)?;
    Ok(digest)
}
