use async_trait::async_trait;
use thiserror::Error;

use crate::password::StoredHash;

/// Failure reported by a credential store.
#[derive(Debug, Clone, Error)]
#[error("Credential lookup failed: {0}")]
pub struct LookupError(pub String);

/// Read access to stored password hashes, keyed by login identifier.
#[async_trait]
pub trait CredentialStore: Send + Sync + 'static {
    /// Retrieve the stored hash for an identifier.
    ///
    /// # Arguments
    /// * `identifier` - Username or email submitted at login
    ///
    /// # Returns
    /// Optional stored hash (None if no such identifier)
    ///
    /// # Errors
    /// * `LookupError` - The store could not be queried
    async fn lookup(&self, identifier: &str) -> Result<Option<StoredHash>, LookupError>;
}
