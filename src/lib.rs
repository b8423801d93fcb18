//! # Warden - Credential and Session Core
//!
//! Facade crate re-exporting the public APIs of the warden workspace:
//! identity registration, email verification, login, refresh tokens and
//! account deletion.
//!
//! ## Usage
//!
//! Add to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! warden = { path = "../warden" }
//! ```
//!
//! ## Structure
//!
//! - **Core domain types**: `Identity`, `Username`, `Email`, `RefreshToken`, etc.
//! - **Ports**: `IdentityRepository`, `OtpRepository`, `RefreshTokenRepository`, `CacheStore`
//! - **Services**: `IdentityService`, `AuthService`
//! - **Adapters**: Postgres and in-memory repositories, decorators, crypto, JWT, events
//! - **Composition**: `postgres_auth_service`, `in_memory_auth_service`

// ============================================================================
// Core Domain Types
// ============================================================================

/// Core domain types and value objects
pub mod core {
    pub use warden_core::*;
}

// Re-export most commonly used core types at the root level
pub use warden_core::{
    AccessToken, DomainEvent, Email, Error, ErrorKind, Identity, IdentityId, Password,
    RefreshToken, Result, Username, VerificationCode,
};

// ============================================================================
// Ports
// ============================================================================

/// Repository and service trait definitions
pub mod ports {
    pub use warden_core::{
        CacheStore, CredentialStore, EventPublisher, HashService, IdentityRepository,
        ImageService, IsolationLevel, OtpRepository, RefreshTokenRepository, TokenWriter,
        TransactionManager, UnitOfWork, UserCreator,
    };
}

// ============================================================================
// Services (Application Layer)
// ============================================================================

/// Application services
pub mod services {
    pub use warden_application::*;
}

pub use warden_application::{
    AuthService, AuthenticationResult, IdentityService, RefreshTokenResponse, RegisterRequest,
};

// ============================================================================
// Adapters (Infrastructure)
// ============================================================================

/// Infrastructure adapters
pub mod adapters {
    /// Postgres, in-memory and Redis storage
    pub mod persistence {
        pub use warden_adapters::persistence::*;
    }

    /// Resilience, observability and cache wrappers
    pub mod decorators {
        pub use warden_adapters::decorators::*;
    }

    pub mod crypto {
        pub use warden_adapters::crypto::*;
    }

    pub mod tokens {
        pub use warden_adapters::tokens::*;
    }

    pub mod events {
        pub use warden_adapters::events::*;
    }

    pub mod images {
        pub use warden_adapters::images::*;
    }

    /// Configuration
    pub mod config {
        pub use warden_adapters::config::*;
    }

    pub mod telemetry {
        pub use warden_adapters::telemetry::*;
    }
}

// ============================================================================
// Composition (Main Entry Point)
// ============================================================================

pub use warden_service::{
    Infrastructure, build_auth_service, configure_postgresql, configure_redis, decorate,
    in_memory_auth_service, postgres_auth_service,
};

// ============================================================================
// Re-export common external dependencies
// ============================================================================

/// Re-export async-trait for implementing repository traits
pub use async_trait::async_trait;

/// Re-export secrecy for working with secrets
pub use secrecy::{ExposeSecret, Secret};
