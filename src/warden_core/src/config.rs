//! Immutable settings injected into services and adapters at startup.

use secrecy::Secret;

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub issuer: String,
    pub audience: String,
    pub secret: Secret<String>,
    pub access_token_ttl: chrono::Duration,
    pub refresh_token_ttl: chrono::Duration,
}

impl TokenConfig {
    pub const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: i64 = 15 * 60;
    pub const DEFAULT_REFRESH_TOKEN_TTL_DAYS: i64 = 30;
}

#[derive(Debug, Clone)]
pub struct HashingConfig {
    /// Server-side secret appended before the unique hash.
    pub pepper: Secret<String>,
    /// Base64 encoded 256-bit key for the event payload cipher.
    pub encryption_key: Secret<String>,
    pub memory_cost_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Clone)]
pub struct VerificationConfig {
    pub code_ttl: chrono::Duration,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            code_ttl: chrono::Duration::minutes(15),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub identity_ttl: std::time::Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            identity_ttl: std::time::Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub token: TokenConfig,
    pub hashing: HashingConfig,
    pub verification: VerificationConfig,
    pub cache: CacheConfig,
}
