use std::fmt;
use std::str::FromStr;

use argon2::password_hash::Output;
use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;

use super::errors::MalformedHash;

/// Algorithm identifier written as the first field of every stored hash.
pub const ALGORITHM_ID: &str = "argon2id";

pub(crate) const MIN_SALT_LEN: usize = 8;
pub(crate) const MAX_SALT_LEN: usize = 64;

// Upper bounds accepted when reading a stored hash back. Values above these
// are treated as malformed rather than computed.
const MAX_MEMORY_KIB: u32 = 1024 * 1024;
const MAX_ITERATIONS: u32 = 64;
const MAX_PARALLELISM: u32 = 64;

/// Argon2 cost parameters.
///
/// Serialized as the cost-factor field of a stored hash: `m=<kib>,t=<iters>,p=<lanes>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes over memory
    pub iterations: u32,
    /// Degree of parallelism (lanes)
    pub parallelism: u32,
}

impl HashCost {
    /// Whether no parameter exceeds `factor` times the matching one in `baseline`.
    pub fn within(&self, baseline: &HashCost, factor: u32) -> bool {
        self.memory_kib <= baseline.memory_kib.saturating_mul(factor)
            && self.iterations <= baseline.iterations.saturating_mul(factor)
            && self.parallelism <= baseline.parallelism.saturating_mul(factor)
    }
}

impl fmt::Display for HashCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "m={},t={},p={}",
            self.memory_kib, self.iterations, self.parallelism
        )
    }
}

impl FromStr for HashCost {
    type Err = MalformedHash;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.split(',');
        let memory_kib = cost_field(fields.next(), "m")?;
        let iterations = cost_field(fields.next(), "t")?;
        let parallelism = cost_field(fields.next(), "p")?;
        if fields.next().is_some() {
            return Err(MalformedHash("unexpected cost parameter"));
        }

        if memory_kib > MAX_MEMORY_KIB
            || iterations > MAX_ITERATIONS
            || parallelism > MAX_PARALLELISM
        {
            return Err(MalformedHash("cost parameter out of range"));
        }

        Ok(Self {
            memory_kib,
            iterations,
            parallelism,
        })
    }
}

fn cost_field(field: Option<&str>, name: &str) -> Result<u32, MalformedHash> {
    let (key, value) = field
        .and_then(|f| f.split_once('='))
        .ok_or(MalformedHash("missing cost parameter"))?;
    if key != name {
        return Err(MalformedHash("unexpected cost parameter"));
    }
    value
        .parse()
        .map_err(|_| MalformedHash("non-numeric cost parameter"))
}

/// Salted password hash as kept by the user store.
///
/// Format: `argon2id$<cost>$<salt-base64>$<hash-base64>` (standard alphabet,
/// unpadded). The value is opaque to callers and may be malformed; it is
/// only interpreted during verification. `PartialEq` is intentionally not
/// implemented: two hashes of the same secret differ by salt, and the
/// digests must only be compared in constant time.
#[derive(Clone)]
pub struct StoredHash(String);

pub(crate) struct HashParts {
    pub cost: HashCost,
    pub salt: Vec<u8>,
    pub digest: Output,
}

impl StoredHash {
    pub(crate) fn from_parts(cost: HashCost, salt: &[u8], digest: &[u8]) -> Self {
        Self(format!(
            "{}${}${}${}",
            ALGORITHM_ID,
            cost,
            STANDARD_NO_PAD.encode(salt),
            STANDARD_NO_PAD.encode(digest)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Split the stored string into its components.
    pub(crate) fn parts(&self) -> Result<HashParts, MalformedHash> {
        let mut fields = self.0.split('$');
        let (Some(algorithm), Some(cost), Some(salt), Some(digest), None) = (
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
            fields.next(),
        ) else {
            return Err(MalformedHash("expected four fields"));
        };

        if algorithm != ALGORITHM_ID {
            return Err(MalformedHash("unknown algorithm"));
        }

        let cost = cost.parse()?;
        let salt = STANDARD_NO_PAD
            .decode(salt)
            .map_err(|_| MalformedHash("salt is not base64"))?;
        if !(MIN_SALT_LEN..=MAX_SALT_LEN).contains(&salt.len()) {
            return Err(MalformedHash("salt length out of range"));
        }

        let digest = STANDARD_NO_PAD
            .decode(digest)
            .map_err(|_| MalformedHash("hash is not base64"))?;
        let digest = Output::new(&digest).map_err(|_| MalformedHash("hash length out of range"))?;

        Ok(HashParts { cost, salt, digest })
    }
}

impl From<String> for StoredHash {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for StoredHash {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Debug for StoredHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StoredHash").field(&"<redacted>").finish()
    }
}
