#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Once;
use std::sync::RwLock;

use async_trait::async_trait;
use session_auth::config::HashingConfig;
use session_auth::config::SigningConfig;
use session_auth::config::TokenConfig;
use session_auth::AuthConfig;
use session_auth::AuthenticationService;
use session_auth::CredentialStore;
use session_auth::LookupError;
use session_auth::ManualClock;
use session_auth::StoredHash;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub const START: i64 = 1_700_000_000;
pub const SECRET: &str = "test-secret-key-for-token-signing-at-least-32-bytes";

static TRACING: Once = Once::new();

/// Install a test subscriber once per test binary.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "session_auth=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init();
    });
}

/// Credential store backed by a map.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    hashes: RwLock<HashMap<String, StoredHash>>,
}

impl InMemoryCredentialStore {
    pub fn insert(&self, identifier: &str, hash: StoredHash) {
        self.hashes
            .write()
            .expect("store lock poisoned")
            .insert(identifier.to_string(), hash);
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn lookup(&self, identifier: &str) -> Result<Option<StoredHash>, LookupError> {
        Ok(self
            .hashes
            .read()
            .map_err(|e| LookupError(e.to_string()))?
            .get(identifier)
            .cloned())
    }
}

/// Service wired to an in-memory store and a manual clock.
pub struct TestApp {
    pub service: AuthenticationService<InMemoryCredentialStore>,
    pub store: Arc<InMemoryCredentialStore>,
    pub clock: Arc<ManualClock>,
}

pub fn test_config() -> AuthConfig {
    AuthConfig {
        signing: SigningConfig {
            key_id: "key-1".to_string(),
            secret: SECRET.to_string(),
            algorithm: "HS256".to_string(),
            grace_period_secs: 300,
        },
        tokens: TokenConfig {
            access_ttl_secs: 900,
            refresh_ttl_secs: 7 * 24 * 60 * 60,
        },
        hashing: HashingConfig {
            // Cheap parameters so tests run quickly
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
            max_concurrent: 4,
            timeout_ms: 60_000,
        },
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AuthConfig) -> Self {
        init_tracing();

        config.validate().expect("Test config should be valid");
        let store = Arc::new(InMemoryCredentialStore::default());
        let clock = Arc::new(ManualClock::at_timestamp(START));
        let service =
            AuthenticationService::from_config(Arc::clone(&store), &config, clock.clone())
                .expect("Failed to create authentication service");

        Self {
            service,
            store,
            clock,
        }
    }

    /// Hash `secret` through the service and store it under `identifier`.
    pub async fn register(&self, identifier: &str, secret: &str) {
        let hash = self
            .service
            .hash_secret(secret)
            .await
            .expect("Failed to hash password");
        self.store.insert(identifier, hash);
    }
}
