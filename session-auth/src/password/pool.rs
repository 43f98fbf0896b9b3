use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use super::argon2::PasswordHasher;
use super::errors::HashingError;
use super::stored_hash::StoredHash;

/// Bounded executor for password hashing.
///
/// Argon2 is CPU and memory bound, so computations run on the blocking thread
/// pool and at most `max_concurrent` of them are in flight at once. Callers
/// beyond that queue on the semaphore. Waiting and computing together are
/// limited by `timeout`.
pub struct HashingPool {
    hasher: Arc<PasswordHasher>,
    permits: Arc<Semaphore>,
    timeout: Duration,
}

impl HashingPool {
    /// Create a hashing pool.
    ///
    /// # Arguments
    /// * `hasher` - Hasher used for every computation
    /// * `max_concurrent` - Maximum number of computations running at once (at least one)
    /// * `timeout` - Upper bound for queueing plus computation
    pub fn new(hasher: PasswordHasher, max_concurrent: usize, timeout: Duration) -> Self {
        Self {
            hasher: Arc::new(hasher),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            timeout,
        }
    }

    pub fn hasher(&self) -> &PasswordHasher {
        &self.hasher
    }

    /// Number of computations that could start right now.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Hash a secret on the pool.
    ///
    /// # Errors
    /// * `Timeout` - No result within the configured timeout
    /// * `WorkerFailed` - The blocking task panicked or was cancelled
    /// * Any error from [`PasswordHasher::hash`]
    pub async fn hash(&self, secret: &str) -> Result<StoredHash, HashingError> {
        let secret = secret.to_owned();
        self.run(move |hasher| hasher.hash(&secret)).await?
    }

    /// Verify a secret on the pool.
    ///
    /// # Errors
    /// * `Timeout` - No result within the configured timeout
    /// * `WorkerFailed` - The blocking task panicked or was cancelled
    pub async fn verify(&self, secret: &str, stored: &StoredHash) -> Result<bool, HashingError> {
        let secret = secret.to_owned();
        let stored = stored.clone();
        self.run(move |hasher| hasher.verify(&secret, &stored)).await
    }

    async fn run<T, F>(&self, work: F) -> Result<T, HashingError>
    where
        T: Send + 'static,
        F: FnOnce(&PasswordHasher) -> T + Send + 'static,
    {
        let hasher = Arc::clone(&self.hasher);
        let permits = Arc::clone(&self.permits);

        let task = async move {
            let permit = permits
                .acquire_owned()
                .await
                .map_err(|e| HashingError::WorkerFailed(e.to_string()))?;

            // The permit moves into the blocking closure: a computation that
            // outlives the timeout keeps counting against the bound.
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                work(&hasher)
            })
            .await
            .map_err(|e| HashingError::WorkerFailed(e.to_string()))
        };

        match tokio::time::timeout(self.timeout, task).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Password hashing timed out"
                );
                Err(HashingError::Timeout(self.timeout))
            }
        }
    }
}
