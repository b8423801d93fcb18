use async_trait::async_trait;
use warden_core::{
    Error, Identity, IdentityId, IdentityRepository, IsolationLevel, OtpCode, OtpRepository,
    RefreshToken, RefreshTokenRepository, Result, StorageFaultKind, TransactionManager,
    Username,
    error::{EMAIL_ALREADY_EXISTS, IDENTITY_DOES_NOT_EXIST, USERNAME_ALREADY_EXISTS},
};

/// Turns raw storage faults into domain errors before they reach the
/// services. Errors that are already classified pass through untouched.
pub struct Resilient<R> {
    entity: &'static str,
    inner: R,
}

impl<R> Resilient<R> {
    pub fn new(entity: &'static str, inner: R) -> Self {
        Self { entity, inner }
    }

    fn classify(&self, operation: &'static str, entity_id: Option<String>, error: Error) -> Error {
        let Error::Storage(fault) = error else {
            return error;
        };

        match (fault.kind(), fault.constraint()) {
            (StorageFaultKind::UniqueViolation, Some(constraint))
                if constraint.contains("username") =>
            {
                Error::bad_request(USERNAME_ALREADY_EXISTS)
            }
            (StorageFaultKind::UniqueViolation, Some(constraint))
                if constraint.contains("email") =>
            {
                Error::bad_request(EMAIL_ALREADY_EXISTS)
            }
            (StorageFaultKind::ForeignKeyViolation, _) => {
                Error::bad_request(IDENTITY_DOES_NOT_EXIST)
            }
            (StorageFaultKind::SerializationFailure, _) => {
                tracing::warn!(
                    entity = self.entity,
                    operation,
                    entity_id = entity_id.as_deref().unwrap_or("-"),
                    "Transaction lost a serialization race"
                );
                Error::conflict(format!("{}.{operation}", self.entity), fault)
            }
            _ => {
                tracing::error!(
                    entity = self.entity,
                    operation,
                    entity_id = entity_id.as_deref().unwrap_or("-"),
                    fault = %fault,
                    "Unclassified storage fault"
                );
                Error::unexpected(format!("{}.{operation}", self.entity), fault)
            }
        }
    }
}

#[async_trait]
impl<R: IdentityRepository> IdentityRepository for Resilient<R> {
    type Tx = R::Tx;

    async fn get_by_id(&self, id: IdentityId) -> Result<Identity> {
        self.inner
            .get_by_id(id)
            .await
            .map_err(|e| self.classify("get_by_id", Some(id.to_string()), e))
    }

    async fn get_by_username(&self, username: &Username) -> Result<Identity> {
        self.inner
            .get_by_username(username)
            .await
            .map_err(|e| self.classify("get_by_username", None, e))
    }

    async fn create(&self, tx: &mut R::Tx, identity: &Identity) -> Result<()> {
        self.inner
            .create(tx, identity)
            .await
            .map_err(|e| self.classify("create", Some(identity.id().to_string()), e))
    }

    async fn email_verified(&self, tx: &mut R::Tx, id: IdentityId) -> Result<()> {
        self.inner
            .email_verified(tx, id)
            .await
            .map_err(|e| self.classify("email_verified", Some(id.to_string()), e))
    }

    async fn delete_by_id(&self, tx: &mut R::Tx, id: IdentityId) -> Result<()> {
        self.inner
            .delete_by_id(tx, id)
            .await
            .map_err(|e| self.classify("delete_by_id", Some(id.to_string()), e))
    }

    async fn forget(&self, id: IdentityId) {
        self.inner.forget(id).await
    }
}

#[async_trait]
impl<R: OtpRepository> OtpRepository for Resilient<R> {
    type Tx = R::Tx;

    async fn get_by_identity_id(&self, identity_id: IdentityId) -> Result<OtpCode> {
        self.inner
            .get_by_identity_id(identity_id)
            .await
            .map_err(|e| self.classify("get_by_identity_id", Some(identity_id.to_string()), e))
    }

    async fn upsert(&self, otp: &OtpCode) -> Result<()> {
        self.inner
            .upsert(otp)
            .await
            .map_err(|e| self.classify("upsert", Some(otp.identity_id().to_string()), e))
    }

    async fn delete(&self, tx: &mut R::Tx, identity_id: IdentityId) -> Result<()> {
        self.inner
            .delete(tx, identity_id)
            .await
            .map_err(|e| self.classify("delete", Some(identity_id.to_string()), e))
    }

    async fn consume(&self, tx: &mut R::Tx, otp: &OtpCode) -> Result<()> {
        self.inner
            .consume(tx, otp)
            .await
            .map_err(|e| self.classify("consume", Some(otp.identity_id().to_string()), e))
    }
}

#[async_trait]
impl<R: RefreshTokenRepository> RefreshTokenRepository for Resilient<R> {
    type Tx = R::Tx;

    async fn get_by_token(&self, token: &[u8]) -> Result<RefreshToken> {
        self.inner
            .get_by_token(token)
            .await
            .map_err(|e| self.classify("get_by_token", None, e))
    }

    async fn get_active_for_identity(&self, identity_id: IdentityId) -> Result<RefreshToken> {
        self.inner
            .get_active_for_identity(identity_id)
            .await
            .map_err(|e| {
                self.classify("get_active_for_identity", Some(identity_id.to_string()), e)
            })
    }

    async fn create(&self, tx: &mut R::Tx, token: &RefreshToken) -> Result<()> {
        self.inner
            .create(tx, token)
            .await
            .map_err(|e| self.classify("create", Some(token.identity_id().to_string()), e))
    }

    async fn delete(&self, token: &[u8]) -> Result<()> {
        self.inner
            .delete(token)
            .await
            .map_err(|e| self.classify("delete", None, e))
    }
}

#[async_trait]
impl<R: TransactionManager> TransactionManager for Resilient<R> {
    type Tx = R::Tx;

    async fn begin(&self, isolation: IsolationLevel) -> Result<R::Tx> {
        self.inner
            .begin(isolation)
            .await
            .map_err(|e| self.classify("begin", None, e))
    }

    async fn commit(&self, tx: R::Tx) -> Result<()> {
        self.inner
            .commit(tx)
            .await
            .map_err(|e| self.classify("commit", None, e))
    }
}
