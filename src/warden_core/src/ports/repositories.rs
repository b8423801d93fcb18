use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    domain::{
        identity::Identity, identity_id::IdentityId, otp_code::OtpCode,
        refresh_token::RefreshToken, username::Username,
    },
    error::Result,
    ports::unit_of_work::{TransactionManager, UnitOfWork},
};

/// Identity persistence. Writes run inside a caller-owned unit of work.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    type Tx: UnitOfWork;

    async fn get_by_id(&self, id: IdentityId) -> Result<Identity>;
    async fn get_by_username(&self, username: &Username) -> Result<Identity>;
    async fn create(&self, tx: &mut Self::Tx, identity: &Identity) -> Result<()>;
    /// One-way transition to `email_verified = true`.
    async fn email_verified(&self, tx: &mut Self::Tx, id: IdentityId) -> Result<()>;
    /// Refresh tokens and otp codes go with the identity.
    async fn delete_by_id(&self, tx: &mut Self::Tx, id: IdentityId) -> Result<()>;
    /// Drop any cached copy of the identity. Called once the write that
    /// changed it has committed; storage without a cache has nothing to drop.
    async fn forget(&self, _id: IdentityId) {}
}

#[async_trait]
pub trait OtpRepository: Send + Sync {
    type Tx: UnitOfWork;

    async fn get_by_identity_id(&self, identity_id: IdentityId) -> Result<OtpCode>;
    /// Creates the code, or overwrites the one already issued.
    async fn upsert(&self, otp: &OtpCode) -> Result<()>;
    async fn delete(&self, tx: &mut Self::Tx, identity_id: IdentityId) -> Result<()>;
    /// Deletes the identity's code only while it is still `otp`. A code that
    /// was reissued in the meantime is reported as not found.
    async fn consume(&self, tx: &mut Self::Tx, otp: &OtpCode) -> Result<()>;
}

#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    type Tx: UnitOfWork;

    /// Expired tokens are reported as not found.
    async fn get_by_token(&self, token: &[u8]) -> Result<RefreshToken>;
    async fn get_active_for_identity(&self, identity_id: IdentityId) -> Result<RefreshToken>;
    async fn create(&self, tx: &mut Self::Tx, token: &RefreshToken) -> Result<()>;
    async fn delete(&self, token: &[u8]) -> Result<()>;
}

/// Keyed blob store with TTL, organised as hashes of fields.
///
/// Patterns are globs where `*` matches any run of characters.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>>;
    async fn hash_set(&self, key: &str, field: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;
    /// Value of the first field matching `pattern`, if any.
    async fn hash_find(&self, key: &str, pattern: &str) -> Result<Option<Vec<u8>>>;
    async fn hash_delete_matching(&self, key: &str, pattern: &str) -> Result<u64>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// The credential repositories sharing one transaction type, as assembled at
/// startup.
pub struct CredentialStore<T: UnitOfWork> {
    pub transactions: Arc<dyn TransactionManager<Tx = T>>,
    pub identities: Arc<dyn IdentityRepository<Tx = T>>,
    pub otps: Arc<dyn OtpRepository<Tx = T>>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository<Tx = T>>,
}

impl<T: UnitOfWork> Clone for CredentialStore<T> {
    fn clone(&self) -> Self {
        Self {
            transactions: Arc::clone(&self.transactions),
            identities: Arc::clone(&self.identities),
            otps: Arc::clone(&self.otps),
            refresh_tokens: Arc::clone(&self.refresh_tokens),
        }
    }
}
