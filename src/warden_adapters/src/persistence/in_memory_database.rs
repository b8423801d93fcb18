use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;
use warden_core::{
    Clock, CredentialStore, Error, Identity, IdentityId, IdentityRepository, ImageService,
    ImageUpload, IsolationLevel, NewUser, OtpCode, OtpRepository, RefreshToken,
    RefreshTokenRepository, Result, StorageFault, StorageFaultKind, SystemClock,
    TransactionManager, UnitOfWork, UserCreator, Username,
};

use super::{IDENTITY_NOT_FOUND, OTP_NOT_FOUND, REFRESH_TOKEN_NOT_FOUND};
use crate::images::{ProfileImageUrls, upload_profile_images};

#[derive(Debug, Clone)]
struct StoredUser {
    user: NewUser,
    urls: ProfileImageUrls,
}

#[derive(Debug, Default, Clone)]
struct Tables {
    identities: HashMap<IdentityId, Identity>,
    otps: HashMap<IdentityId, OtpCode>,
    refresh_tokens: HashMap<Vec<u8>, RefreshToken>,
    users: HashMap<IdentityId, StoredUser>,
}

#[derive(Debug, Clone)]
enum Write {
    CreateIdentity(Identity),
    VerifyEmail(IdentityId),
    DeleteIdentity(IdentityId),
    DeleteOtp(IdentityId),
    ConsumeOtp(OtpCode),
    CreateRefreshToken(RefreshToken),
    CreateUser(StoredUser),
}

fn violation(kind: StorageFaultKind, constraint: &str) -> Error {
    let message = format!("violates constraint \"{constraint}\"");
    Error::Storage(StorageFault::new(kind, Some(constraint.to_string()), message))
}

impl Tables {
    /// Apply one write with the same constraints as the PostgreSQL schema.
    fn apply(&mut self, write: &Write) -> Result<()> {
        match write {
            Write::CreateIdentity(identity) => {
                if self.identities.contains_key(&identity.id()) {
                    return Err(violation(StorageFaultKind::UniqueViolation, "identities_pkey"));
                }
                if self
                    .identities
                    .values()
                    .any(|existing| existing.username() == identity.username())
                {
                    return Err(violation(
                        StorageFaultKind::UniqueViolation,
                        "identities_username_key",
                    ));
                }
                if self
                    .identities
                    .values()
                    .any(|existing| existing.email().hash == identity.email().hash)
                {
                    return Err(violation(
                        StorageFaultKind::UniqueViolation,
                        "identities_email_hash_key",
                    ));
                }
                self.identities.insert(identity.id(), identity.clone());
            }
            Write::VerifyEmail(id) => {
                let identity = self
                    .identities
                    .remove(id)
                    .ok_or_else(|| Error::not_found(IDENTITY_NOT_FOUND))?;
                self.identities.insert(*id, identity.into_verified());
            }
            Write::DeleteIdentity(id) => {
                self.identities
                    .remove(id)
                    .ok_or_else(|| Error::not_found(IDENTITY_NOT_FOUND))?;
                self.otps.remove(id);
                self.users.remove(id);
                self.refresh_tokens
                    .retain(|_, token| token.identity_id() != *id);
            }
            Write::DeleteOtp(id) => {
                self.otps
                    .remove(id)
                    .ok_or_else(|| Error::not_found(OTP_NOT_FOUND))?;
            }
            Write::ConsumeOtp(otp) => {
                if self.otps.get(&otp.identity_id()).map(OtpCode::code) != Some(otp.code()) {
                    return Err(Error::not_found(OTP_NOT_FOUND));
                }
                self.otps.remove(&otp.identity_id());
            }
            Write::CreateRefreshToken(token) => {
                if !self.identities.contains_key(&token.identity_id()) {
                    return Err(violation(
                        StorageFaultKind::ForeignKeyViolation,
                        "refresh_tokens_identity_id_fkey",
                    ));
                }
                if self.refresh_tokens.contains_key(token.token()) {
                    return Err(violation(StorageFaultKind::UniqueViolation, "refresh_tokens_pkey"));
                }
                self.refresh_tokens
                    .insert(token.token().to_vec(), token.clone());
            }
            Write::CreateUser(stored) => {
                if !self.identities.contains_key(&stored.user.id) {
                    return Err(violation(
                        StorageFaultKind::ForeignKeyViolation,
                        "users_id_fkey",
                    ));
                }
                if self.users.contains_key(&stored.user.id) {
                    return Err(violation(StorageFaultKind::UniqueViolation, "users_pkey"));
                }
                self.users.insert(stored.user.id, stored.clone());
            }
        }
        Ok(())
    }
}

/// Shared in-process tables behind the in-memory repositories.
#[derive(Clone)]
pub struct InMemoryDatabase {
    tables: Arc<RwLock<Tables>>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// The clock decides which refresh tokens read as expired.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            clock,
        }
    }

    /// Raw repositories over this database, without any decorators.
    pub fn credential_store(&self) -> CredentialStore<InMemoryUnitOfWork> {
        CredentialStore {
            transactions: Arc::new(self.transaction_manager()),
            identities: Arc::new(self.identity_repository()),
            otps: Arc::new(self.otp_repository()),
            refresh_tokens: Arc::new(self.refresh_token_repository()),
        }
    }

    pub fn transaction_manager(&self) -> InMemoryTransactionManager {
        InMemoryTransactionManager {
            tables: self.tables.clone(),
        }
    }

    pub fn identity_repository(&self) -> InMemoryIdentityRepository {
        InMemoryIdentityRepository {
            tables: self.tables.clone(),
        }
    }

    pub fn otp_repository(&self) -> InMemoryOtpRepository {
        InMemoryOtpRepository {
            tables: self.tables.clone(),
        }
    }

    pub fn refresh_token_repository(&self) -> InMemoryRefreshTokenRepository {
        InMemoryRefreshTokenRepository {
            tables: self.tables.clone(),
            clock: self.clock.clone(),
        }
    }

    /// A profile creator that stores no images.
    pub fn user_creator(&self) -> InMemoryUserCreator {
        InMemoryUserCreator { images: None }
    }

    pub fn user_creator_with_images(&self, images: Arc<dyn ImageService>) -> InMemoryUserCreator {
        InMemoryUserCreator {
            images: Some(images),
        }
    }

    pub async fn identity_count(&self) -> usize {
        self.tables.read().await.identities.len()
    }

    pub async fn has_profile(&self, id: IdentityId) -> bool {
        self.tables.read().await.users.contains_key(&id)
    }

    pub async fn profile_image_urls(&self, id: IdentityId) -> Option<ProfileImageUrls> {
        self.tables
            .read()
            .await
            .users
            .get(&id)
            .map(|stored| stored.urls.clone())
    }

    pub async fn has_otp(&self, id: IdentityId) -> bool {
        self.tables.read().await.otps.contains_key(&id)
    }

    /// Stored refresh tokens for the identity, expired ones included.
    pub async fn refresh_token_count(&self, id: IdentityId) -> usize {
        self.tables
            .read()
            .await
            .refresh_tokens
            .values()
            .filter(|token| token.identity_id() == id)
            .count()
    }
}

/// Writes are checked against a private view as they are staged and applied
/// to the shared tables on commit. Dropping the unit of work discards them.
pub struct InMemoryUnitOfWork {
    tables: Arc<RwLock<Tables>>,
    view: Tables,
    staged: Vec<Write>,
}

impl InMemoryUnitOfWork {
    fn stage(&mut self, write: Write) -> Result<()> {
        self.view.apply(&write)?;
        self.staged.push(write);
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn commit(self) -> Result<()> {
        let mut tables = self.tables.write().await;

        // All or nothing: concurrent commits may have invalidated a write.
        let mut next = tables.clone();
        for write in &self.staged {
            next.apply(write)?;
        }
        *tables = next;

        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

pub struct InMemoryTransactionManager {
    tables: Arc<RwLock<Tables>>,
}

#[async_trait]
impl TransactionManager for InMemoryTransactionManager {
    type Tx = InMemoryUnitOfWork;

    async fn begin(&self, _isolation: IsolationLevel) -> Result<InMemoryUnitOfWork> {
        let view = self.tables.read().await.clone();

        Ok(InMemoryUnitOfWork {
            tables: self.tables.clone(),
            view,
            staged: Vec::new(),
        })
    }
}

pub struct InMemoryIdentityRepository {
    tables: Arc<RwLock<Tables>>,
}

#[async_trait]
impl IdentityRepository for InMemoryIdentityRepository {
    type Tx = InMemoryUnitOfWork;

    async fn get_by_id(&self, id: IdentityId) -> Result<Identity> {
        self.tables
            .read()
            .await
            .identities
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::not_found(IDENTITY_NOT_FOUND))
    }

    async fn get_by_username(&self, username: &Username) -> Result<Identity> {
        self.tables
            .read()
            .await
            .identities
            .values()
            .find(|identity| identity.username() == username)
            .cloned()
            .ok_or_else(|| Error::not_found(IDENTITY_NOT_FOUND))
    }

    async fn create(&self, tx: &mut InMemoryUnitOfWork, identity: &Identity) -> Result<()> {
        tx.stage(Write::CreateIdentity(identity.clone()))
    }

    async fn email_verified(&self, tx: &mut InMemoryUnitOfWork, id: IdentityId) -> Result<()> {
        tx.stage(Write::VerifyEmail(id))
    }

    async fn delete_by_id(&self, tx: &mut InMemoryUnitOfWork, id: IdentityId) -> Result<()> {
        tx.stage(Write::DeleteIdentity(id))
    }
}

pub struct InMemoryOtpRepository {
    tables: Arc<RwLock<Tables>>,
}

#[async_trait]
impl OtpRepository for InMemoryOtpRepository {
    type Tx = InMemoryUnitOfWork;

    async fn get_by_identity_id(&self, identity_id: IdentityId) -> Result<OtpCode> {
        self.tables
            .read()
            .await
            .otps
            .get(&identity_id)
            .cloned()
            .ok_or_else(|| Error::not_found(OTP_NOT_FOUND))
    }

    async fn upsert(&self, otp: &OtpCode) -> Result<()> {
        let mut tables = self.tables.write().await;
        if !tables.identities.contains_key(&otp.identity_id()) {
            return Err(violation(
                StorageFaultKind::ForeignKeyViolation,
                "otp_codes_identity_id_fkey",
            ));
        }
        tables.otps.insert(otp.identity_id(), otp.clone());
        Ok(())
    }

    async fn delete(&self, tx: &mut InMemoryUnitOfWork, identity_id: IdentityId) -> Result<()> {
        tx.stage(Write::DeleteOtp(identity_id))
    }

    async fn consume(&self, tx: &mut InMemoryUnitOfWork, otp: &OtpCode) -> Result<()> {
        tx.stage(Write::ConsumeOtp(otp.clone()))
    }
}

pub struct InMemoryRefreshTokenRepository {
    tables: Arc<RwLock<Tables>>,
    clock: Arc<dyn Clock>,
}

#[async_trait]
impl RefreshTokenRepository for InMemoryRefreshTokenRepository {
    type Tx = InMemoryUnitOfWork;

    async fn get_by_token(&self, token: &[u8]) -> Result<RefreshToken> {
        let now = self.clock.now();
        self.tables
            .read()
            .await
            .refresh_tokens
            .get(token)
            .filter(|stored| !stored.is_expired(now))
            .cloned()
            .ok_or_else(|| Error::not_found(REFRESH_TOKEN_NOT_FOUND))
    }

    async fn get_active_for_identity(&self, identity_id: IdentityId) -> Result<RefreshToken> {
        let now = self.clock.now();
        self.tables
            .read()
            .await
            .refresh_tokens
            .values()
            .filter(|stored| stored.identity_id() == identity_id && !stored.is_expired(now))
            .max_by_key(|stored| stored.expiration_date())
            .cloned()
            .ok_or_else(|| Error::not_found(REFRESH_TOKEN_NOT_FOUND))
    }

    async fn create(&self, tx: &mut InMemoryUnitOfWork, token: &RefreshToken) -> Result<()> {
        tx.stage(Write::CreateRefreshToken(token.clone()))
    }

    async fn delete(&self, token: &[u8]) -> Result<()> {
        self.tables
            .write()
            .await
            .refresh_tokens
            .remove(token)
            .map(|_| ())
            .ok_or_else(|| Error::not_found(REFRESH_TOKEN_NOT_FOUND))
    }
}

pub struct InMemoryUserCreator {
    images: Option<Arc<dyn ImageService>>,
}

#[async_trait]
impl UserCreator for InMemoryUserCreator {
    type Tx = InMemoryUnitOfWork;

    async fn create_user(
        &self,
        tx: &mut InMemoryUnitOfWork,
        user: &NewUser,
        profile_image: Option<ImageUpload>,
        background_image: Option<ImageUpload>,
    ) -> Result<()> {
        let urls = match &self.images {
            Some(images) => {
                upload_profile_images(images.as_ref(), user.id, profile_image, background_image)
                    .await?
            }
            None => ProfileImageUrls::default(),
        };

        tx.stage(Write::CreateUser(StoredUser {
            user: user.clone(),
            urls,
        }))
    }
}
