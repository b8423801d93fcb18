pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

// Re-export commonly used types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, CoreConfig, HashingConfig, TokenConfig, VerificationConfig};
pub use domain::{
    access_token::AccessToken,
    email::Email,
    events::{DomainEvent, VerificationMessage},
    hashed::{SaltedHash, SealedPayload},
    identity::Identity,
    identity_id::IdentityId,
    otp_code::OtpCode,
    password::Password,
    profile::{ImageKind, ImageUpload, NewUser},
    refresh_token::{MAX_REFRESH_TOKEN_BYTES, REFRESH_TOKEN_LENGTH, RefreshToken},
    username::Username,
    validation_error::ValidationError,
    verification_code::VerificationCode,
};
pub use error::{BoxError, Error, ErrorKind, Result, StorageFault, StorageFaultKind};

pub use ports::{
    repositories::{
        CacheStore, CredentialStore, IdentityRepository, OtpRepository, RefreshTokenRepository,
    },
    services::{EventPublisher, HashService, ImageService, TokenWriter, UserCreator},
    unit_of_work::{IsolationLevel, TransactionManager, UnitOfWork},
};
