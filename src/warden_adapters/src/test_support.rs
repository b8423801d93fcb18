//! Fixtures shared by the test suites of every crate in the workspace.

use base64::{Engine, engine::general_purpose::STANDARD};
use secrecy::Secret;
use warden_core::{CacheConfig, CoreConfig, HashingConfig, TokenConfig, VerificationConfig};

/// Argon2 parameters cheap enough for tests.
pub fn fast_hashing_config() -> HashingConfig {
    HashingConfig {
        pepper: Secret::new("test-pepper".to_string()),
        encryption_key: Secret::new(STANDARD.encode([7u8; 32])),
        memory_cost_kib: 1024,
        iterations: 1,
        parallelism: 1,
    }
}

pub fn token_config() -> TokenConfig {
    TokenConfig {
        issuer: "warden".to_string(),
        audience: "warden-clients".to_string(),
        secret: Secret::new("test-jwt-secret-with-enough-entropy".to_string()),
        access_token_ttl: chrono::Duration::minutes(15),
        refresh_token_ttl: chrono::Duration::days(30),
    }
}

pub fn core_config() -> CoreConfig {
    CoreConfig {
        token: token_config(),
        hashing: fast_hashing_config(),
        verification: VerificationConfig::default(),
        cache: CacheConfig::default(),
    }
}
