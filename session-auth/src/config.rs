use std::env;
use std::fmt;
use std::time::Duration as StdDuration;

use chrono::Duration;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::password::HashCost;
use crate::password::PasswordHasher;
use crate::token::keys::parse_algorithm;
use crate::token::keys::MIN_SECRET_LEN;
use crate::token::KeyError;
use crate::token::SigningKey;

/// Configuration for the authentication core.
///
/// Every field is required; in particular there is no fallback signing secret.
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub signing: SigningConfig,
    pub tokens: TokenConfig,
    pub hashing: HashingConfig,
}

#[derive(Deserialize, Clone)]
pub struct SigningConfig {
    pub key_id: String,
    pub secret: String,
    /// HS256, HS384 or HS512
    pub algorithm: String,
    /// How long a rotated-out key keeps verifying tokens
    pub grace_period_secs: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    /// Upper bound on hashing computations running at once
    pub max_concurrent: usize,
    /// Upper bound on queueing plus computing, in milliseconds
    pub timeout_ms: u64,
}

impl fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningConfig")
            .field("key_id", &self.key_id)
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("grace_period_secs", &self.grace_period_secs)
            .finish()
    }
}

impl AuthConfig {
    /// Load configuration from files with environment variable overrides.
    ///
    /// Convenience for the hosting binary; nothing inside this crate reads
    /// files or the environment. Embedders that own their configuration
    /// build an `AuthConfig` directly or pass their sources to
    /// [`AuthConfig::from_sources`].
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (AUTH__SIGNING__SECRET, AUTH__TOKENS__ACCESS_TTL_SECS, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: AUTH__SIGNING__SECRET=... overrides signing.secret
            .add_source(Environment::with_prefix("AUTH").separator("__"))
            .build()?;

        Self::from_sources(configuration)
    }

    /// Deserialize and validate configuration from assembled sources.
    ///
    /// # Errors
    /// * Missing or mistyped fields
    /// * Any constraint checked by [`AuthConfig::validate`]
    pub fn from_sources(configuration: ConfigBuilder) -> Result<Self, ConfigError> {
        let config: AuthConfig = configuration.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signing.secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Message(format!(
                "signing.secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }
        parse_algorithm(&self.signing.algorithm)
            .map_err(|e| ConfigError::Message(format!("signing.algorithm: {}", e)))?;
        if self.signing.grace_period_secs < 0 {
            return Err(ConfigError::Message(
                "signing.grace_period_secs must not be negative".to_string(),
            ));
        }

        if self.tokens.access_ttl_secs <= 0 {
            return Err(ConfigError::Message(
                "tokens.access_ttl_secs must be positive".to_string(),
            ));
        }
        if self.tokens.refresh_ttl_secs <= self.tokens.access_ttl_secs {
            return Err(ConfigError::Message(
                "tokens.refresh_ttl_secs must be longer than tokens.access_ttl_secs".to_string(),
            ));
        }

        if self.hashing.max_concurrent == 0 {
            return Err(ConfigError::Message(
                "hashing.max_concurrent must be at least 1".to_string(),
            ));
        }
        if self.hashing.timeout_ms == 0 {
            return Err(ConfigError::Message(
                "hashing.timeout_ms must be positive".to_string(),
            ));
        }
        PasswordHasher::new(self.hashing.cost())
            .map_err(|e| ConfigError::Message(format!("hashing: {}", e)))?;

        Ok(())
    }
}

impl SigningConfig {
    /// Build the signing key described by this section.
    pub fn signing_key(&self) -> Result<SigningKey, KeyError> {
        let algorithm = parse_algorithm(&self.algorithm)?;
        SigningKey::hmac(self.key_id.clone(), self.secret.as_bytes(), algorithm)
    }
}

impl TokenConfig {
    pub fn access_ttl(&self) -> Duration {
        Duration::seconds(self.access_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::seconds(self.refresh_ttl_secs)
    }
}

impl HashingConfig {
    pub fn cost(&self) -> HashCost {
        HashCost {
            memory_kib: self.memory_kib,
            iterations: self.iterations,
            parallelism: self.parallelism,
        }
    }

    pub fn timeout(&self) -> StdDuration {
        StdDuration::from_millis(self.timeout_ms)
    }
}
