use std::sync::Arc;

use warden_core::{
    Clock, CredentialStore, Email, Error, HashService, Identity, IdentityId, ImageService,
    ImageUpload, IsolationLevel, NewUser, OtpCode, Password, Result, UnitOfWork, UserCreator,
    Username, VerificationCode, VerificationConfig,
    error::{INVALID_CREDENTIALS, INVALID_VERIFICATION_CODE},
};

const REGISTRATION_ATTEMPTS: u32 = 3;

/// Everything needed to register a new identity and its profile.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: Username,
    pub email: Email,
    pub password: Password,
    pub display_name: String,
    pub bio: Option<String>,
    pub profile_image: Option<ImageUpload>,
    pub background_image: Option<ImageUpload>,
}

/// Identity lifecycle: registration, credential checks, email verification
/// and deletion.
pub struct IdentityService<T: UnitOfWork> {
    store: CredentialStore<T>,
    users: Arc<dyn UserCreator<Tx = T>>,
    images: Arc<dyn ImageService>,
    hasher: Arc<dyn HashService>,
    clock: Arc<dyn Clock>,
    verification: VerificationConfig,
}

impl<T: UnitOfWork> IdentityService<T> {
    pub fn new(
        store: CredentialStore<T>,
        users: Arc<dyn UserCreator<Tx = T>>,
        images: Arc<dyn ImageService>,
        hasher: Arc<dyn HashService>,
        clock: Arc<dyn Clock>,
        verification: VerificationConfig,
    ) -> Self {
        Self {
            store,
            users,
            images,
            hasher,
            clock,
            verification,
        }
    }

    /// Create the identity and its profile in one serializable transaction.
    ///
    /// A transaction that loses a serialization race is retried from the
    /// start. Images uploaded by a failed attempt are deleted again.
    ///
    /// # Returns
    /// The new, unverified identity. Nothing is persisted unless both the
    /// identity and the profile were created.
    #[tracing::instrument(name = "IdentityService::register", skip_all, fields(username = %registration.username))]
    pub async fn register(&self, registration: Registration) -> Result<Identity> {
        let password = self.hasher.hash(registration.password.as_ref()).await?;
        let email = self.hasher.hash_email(&registration.email).await?;
        let identity = Identity::new(
            IdentityId::new(),
            registration.username.clone(),
            password,
            email,
        );
        let has_images =
            registration.profile_image.is_some() || registration.background_image.is_some();

        let mut attempt = 1;
        loop {
            let result = self.try_register(&identity, &registration).await;

            if result.is_err() && has_images && !self.images.delete_all_images(identity.id()).await {
                tracing::warn!(identity_id = %identity.id(), "Registration failed and image cleanup failed");
            }

            match result {
                Ok(()) => break,
                Err(Error::Conflict { context, .. }) if attempt < REGISTRATION_ATTEMPTS => {
                    tracing::warn!(attempt, %context, "Retrying registration after a conflict");
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }

        tracing::info!(identity_id = %identity.id(), "Identity registered");
        Ok(identity)
    }

    async fn try_register(&self, identity: &Identity, registration: &Registration) -> Result<()> {
        let mut tx = self
            .store
            .transactions
            .begin(IsolationLevel::Serializable)
            .await?;

        // The uncommitted transaction rolls back when dropped.
        self.store.identities.create(&mut tx, identity).await?;

        let user = NewUser {
            id: identity.id(),
            username: registration.username.clone(),
            display_name: registration.display_name.clone(),
            bio: registration.bio.clone(),
        };

        if let Err(error) = self
            .users
            .create_user(
                &mut tx,
                &user,
                registration.profile_image.clone(),
                registration.background_image.clone(),
            )
            .await
        {
            if let Err(rollback_error) = tx.rollback().await {
                tracing::error!(error = ?rollback_error, identity_id = %identity.id(), "Failed to roll back registration");
            }
            return Err(error);
        }

        self.store.transactions.commit(tx).await
    }

    /// Check a username / password pair.
    ///
    /// Unknown usernames and wrong passwords produce the same error.
    #[tracing::instrument(name = "IdentityService::login", skip_all, fields(username = %username))]
    pub async fn login(&self, username: &Username, password: &Password) -> Result<Identity> {
        let identity = match self.store.identities.get_by_username(username).await {
            Ok(identity) => identity,
            Err(Error::NotFound(_)) => return Err(Error::bad_request(INVALID_CREDENTIALS)),
            Err(error) => return Err(error),
        };

        if !self
            .hasher
            .verify(password.as_ref(), identity.password())
            .await?
        {
            return Err(Error::bad_request(INVALID_CREDENTIALS));
        }

        Ok(identity)
    }

    pub async fn get_by_id(&self, id: IdentityId) -> Result<Identity> {
        self.store.identities.get_by_id(id).await
    }

    /// Issue a fresh code, overwriting any previous one for the identity.
    ///
    /// # Returns
    /// The plaintext code; only its hash is stored.
    #[tracing::instrument(name = "IdentityService::issue_verification_code", skip(self))]
    pub async fn issue_verification_code(&self, identity_id: IdentityId) -> Result<VerificationCode> {
        let code = VerificationCode::generate();
        let hashed = self.hasher.hash(code.as_ref()).await?;
        let expires_at = self.clock.now() + self.verification.code_ttl;

        self.store
            .otps
            .upsert(&OtpCode::new(identity_id, hashed, expires_at))
            .await?;

        Ok(code)
    }

    /// Re-issue a code for an unverified identity, provided the caller knows
    /// the address it registered with.
    #[tracing::instrument(name = "IdentityService::reissue_verification_code", skip(self, email))]
    pub async fn reissue_verification_code(
        &self,
        identity_id: IdentityId,
        email: &Email,
    ) -> Result<VerificationCode> {
        let identity = self.store.identities.get_by_id(identity_id).await?;

        if identity.email_verified() {
            return Err(Error::bad_request("Email is already verified"));
        }

        if self.hasher.hash_email(email).await? != *identity.email() {
            return Err(Error::bad_request("Email does not match"));
        }

        self.issue_verification_code(identity_id).await
    }

    /// Consume the identity's code and mark its email verified.
    ///
    /// A mismatched or expired code leaves the stored code untouched so the
    /// user can retry until it expires.
    #[tracing::instrument(name = "IdentityService::verify_email", skip(self, code))]
    pub async fn verify_email(&self, identity_id: IdentityId, code: &VerificationCode) -> Result<()> {
        let otp = match self.store.otps.get_by_identity_id(identity_id).await {
            Ok(otp) => otp,
            Err(Error::NotFound(_)) => return Err(Error::bad_request(INVALID_VERIFICATION_CODE)),
            Err(error) => return Err(error),
        };

        if otp.is_expired(self.clock.now()) || !self.hasher.verify(code.as_ref(), otp.code()).await? {
            return Err(Error::bad_request(INVALID_VERIFICATION_CODE));
        }

        let mut tx = self
            .store
            .transactions
            .begin(IsolationLevel::RepeatableRead)
            .await?;

        // Only the code that was checked may be consumed. A code reissued or
        // consumed since the read above reports not found.
        match self.store.otps.consume(&mut tx, &otp).await {
            Ok(()) => {}
            Err(Error::NotFound(_)) => return Err(Error::bad_request(INVALID_VERIFICATION_CODE)),
            Err(error) => return Err(error),
        }
        self.store.identities.email_verified(&mut tx, identity_id).await?;

        match self.store.transactions.commit(tx).await {
            Ok(()) => {}
            Err(Error::NotFound(_)) => return Err(Error::bad_request(INVALID_VERIFICATION_CODE)),
            Err(error) => return Err(error),
        }
        self.store.identities.forget(identity_id).await;

        Ok(())
    }

    /// Delete the identity, then ask the image collaborator to clean up.
    ///
    /// Cleanup is best effort and runs after the commit: `Ok(false)` means
    /// the identity is gone but its images may not be.
    #[tracing::instrument(name = "IdentityService::delete_by_id", skip(self))]
    pub async fn delete_by_id(&self, identity_id: IdentityId) -> Result<bool> {
        let mut tx = self
            .store
            .transactions
            .begin(IsolationLevel::RepeatableRead)
            .await?;

        self.store.identities.delete_by_id(&mut tx, identity_id).await?;
        self.store.transactions.commit(tx).await?;
        self.store.identities.forget(identity_id).await;

        let images_deleted = self.images.delete_all_images(identity_id).await;
        if !images_deleted {
            tracing::warn!(%identity_id, "Identity deleted but image cleanup failed");
        }

        Ok(images_deleted)
    }
}
