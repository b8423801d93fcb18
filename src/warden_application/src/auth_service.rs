use std::sync::Arc;

use secrecy::{ExposeSecret, Secret};
use warden_core::{
    Clock, CredentialStore, DomainEvent, Email, Error, ErrorKind, EventPublisher, HashService,
    Identity, IdentityId, ImageUpload, IsolationLevel, Password, RefreshToken, Result,
    SealedPayload, TokenWriter, UnitOfWork, Username, VerificationCode, VerificationMessage,
    error::{INVALID_CREDENTIALS, INVALID_REFRESH_TOKEN},
};

use crate::{
    identity_service::{IdentityService, Registration},
    responses::{AuthenticationResult, RefreshTokenResponse},
};

/// Unvalidated registration input as received from the transport layer.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub username: String,
    pub email: Secret<String>,
    pub password: Secret<String>,
    pub display_name: String,
    pub bio: Option<String>,
    pub profile_image: Option<ImageUpload>,
    pub background_image: Option<ImageUpload>,
}

/// Public authentication contract.
///
/// Expected failures (bad credentials, invalid tokens, unknown identities)
/// come back as unsuccessful results, never as errors.
pub struct AuthService<T: UnitOfWork> {
    identities: IdentityService<T>,
    store: CredentialStore<T>,
    tokens: Arc<dyn TokenWriter>,
    hasher: Arc<dyn HashService>,
    publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
}

impl<T: UnitOfWork> AuthService<T> {
    pub fn new(
        identities: IdentityService<T>,
        store: CredentialStore<T>,
        tokens: Arc<dyn TokenWriter>,
        hasher: Arc<dyn HashService>,
        publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            identities,
            store,
            tokens,
            hasher,
            publisher,
            clock,
        }
    }

    /// Register a new identity and send it a verification code.
    ///
    /// # Returns
    /// A successful result without an access token: the identity must verify
    /// its email before it can log in.
    #[tracing::instrument(name = "AuthService::register", skip_all, fields(username = %request.username))]
    pub async fn register(&self, request: RegisterRequest) -> AuthenticationResult {
        let registration = match parse_registration(request) {
            Ok(registration) => registration,
            Err(error) => return AuthenticationResult::failure(error.public_message()),
        };
        let email = registration.email.clone();

        let identity = match self.identities.register(registration).await {
            Ok(identity) => identity,
            Err(error) => return failure("register", error),
        };

        // The identity is committed at this point. A failure to issue the
        // code is recoverable through `resend_verification_code`.
        match self.identities.issue_verification_code(identity.id()).await {
            Ok(code) => match self.seal_verification(&email, &code) {
                Ok(verification) => {
                    self.publish(DomainEvent::UserCreated {
                        identity_id: identity.id(),
                        username: identity.username().to_string(),
                        verification,
                    })
                    .await;
                }
                Err(error) => {
                    tracing::error!(error = ?error, identity_id = %identity.id(), "Failed to seal verification message");
                }
            },
            Err(error) => {
                tracing::error!(error = ?error, identity_id = %identity.id(), "Failed to issue verification code");
            }
        }

        AuthenticationResult::unverified(&identity)
    }

    /// # Returns
    /// `true` once the identity's email is verified.
    #[tracing::instrument(name = "AuthService::verify_email", skip(self, code))]
    pub async fn verify_email(&self, identity_id: IdentityId, code: &str) -> bool {
        let Ok(code) = VerificationCode::parse(code) else {
            return false;
        };

        match self.identities.verify_email(identity_id, &code).await {
            Ok(()) => true,
            Err(error) => {
                log_unexpected("verify_email", &error);
                false
            }
        }
    }

    /// Issue a new code for an unverified identity and publish it.
    #[tracing::instrument(name = "AuthService::resend_verification_code", skip(self, email))]
    pub async fn resend_verification_code(&self, identity_id: IdentityId, email: Secret<String>) -> bool {
        let Ok(email) = Email::try_from(email) else {
            return false;
        };

        let verification = match self
            .identities
            .reissue_verification_code(identity_id, &email)
            .await
            .and_then(|code| self.seal_verification(&email, &code))
        {
            Ok(verification) => verification,
            Err(error) => {
                log_unexpected("resend_verification_code", &error);
                return false;
            }
        };

        self.publish(DomainEvent::VerifyEmailAddress {
            identity_id,
            verification,
        })
        .await;
        true
    }

    /// Authenticate with username and password.
    ///
    /// # Returns
    /// - unverified identity: `success = true` with no tokens
    /// - verified identity: an access token and the identity's active
    ///   refresh token, minted if none exists yet
    #[tracing::instrument(name = "AuthService::login", skip(self, password))]
    pub async fn login(
        &self,
        username: &str,
        password: Secret<String>,
    ) -> (AuthenticationResult, Option<RefreshTokenResponse>) {
        let (Ok(username), Ok(password)) = (Username::try_from(username), Password::try_from(password))
        else {
            return (AuthenticationResult::failure(INVALID_CREDENTIALS), None);
        };

        let identity = match self.identities.login(&username, &password).await {
            Ok(identity) => identity,
            Err(error) => return (failure("login", error), None),
        };

        if !identity.email_verified() {
            return (AuthenticationResult::unverified(&identity), None);
        }

        match self.open_session(&identity).await {
            Ok((result, refresh_token)) => (result, Some(refresh_token)),
            Err(error) => (failure("login", error), None),
        }
    }

    /// Mint a new access token from a refresh token. The refresh token itself
    /// is not rotated.
    #[tracing::instrument(name = "AuthService::refresh_access_token", skip_all)]
    pub async fn refresh_access_token(&self, refresh_token: &str) -> AuthenticationResult {
        match self.try_refresh(refresh_token).await {
            Ok(result) => result,
            Err(error) if error.kind() == ErrorKind::Unexpected => failure("refresh_access_token", error),
            Err(_) => AuthenticationResult::failure(INVALID_REFRESH_TOKEN),
        }
    }

    #[tracing::instrument(name = "AuthService::revoke_refresh_token", skip_all)]
    pub async fn revoke_refresh_token(&self, refresh_token: &str) -> bool {
        let Ok(token) = self.tokens.parse_refresh_token(refresh_token) else {
            return false;
        };

        match self.store.refresh_tokens.delete(&token).await {
            Ok(()) => true,
            Err(error) => {
                log_unexpected("revoke_refresh_token", &error);
                false
            }
        }
    }

    /// Delete the identity with its sessions and codes.
    ///
    /// # Returns
    /// `false` if the identity could not be deleted, or if it was deleted but
    /// its images could not be cleaned up.
    #[tracing::instrument(name = "AuthService::delete_by_id", skip(self))]
    pub async fn delete_by_id(&self, identity_id: IdentityId) -> bool {
        match self.identities.delete_by_id(identity_id).await {
            Ok(images_deleted) => {
                self.publish(DomainEvent::UserDeleted { identity_id }).await;
                images_deleted
            }
            Err(error) => {
                log_unexpected("delete_by_id", &error);
                false
            }
        }
    }

    async fn open_session(
        &self,
        identity: &Identity,
    ) -> Result<(AuthenticationResult, RefreshTokenResponse)> {
        let refresh_token = match self
            .store
            .refresh_tokens
            .get_active_for_identity(identity.id())
            .await
        {
            Ok(existing) => existing,
            Err(Error::NotFound(_)) => self.mint_refresh_token(identity.id()).await?,
            Err(error) => return Err(error),
        };

        let access_token = self.tokens.generate_access_token(identity)?;

        Ok((
            AuthenticationResult::authenticated(identity, access_token),
            RefreshTokenResponse {
                token: self.tokens.encode_refresh_token(&refresh_token),
                expires_at: refresh_token.expiration_date(),
            },
        ))
    }

    // Look-before-insert: two concurrent logins may both mint a token.
    async fn mint_refresh_token(&self, identity_id: IdentityId) -> Result<RefreshToken> {
        let token = self.tokens.generate_refresh_token(identity_id);

        let mut tx = self
            .store
            .transactions
            .begin(IsolationLevel::ReadCommitted)
            .await?;
        self.store.refresh_tokens.create(&mut tx, &token).await?;
        self.store.transactions.commit(tx).await?;

        Ok(token)
    }

    async fn try_refresh(&self, refresh_token: &str) -> Result<AuthenticationResult> {
        let token = self.tokens.parse_refresh_token(refresh_token)?;
        let stored = self.store.refresh_tokens.get_by_token(&token).await?;

        if stored.is_expired(self.clock.now()) {
            return Err(Error::bad_request(INVALID_REFRESH_TOKEN));
        }

        let identity = self.identities.get_by_id(stored.identity_id()).await?;
        let access_token = self.tokens.generate_access_token(&identity)?;

        Ok(AuthenticationResult::authenticated(&identity, access_token))
    }

    fn seal_verification(&self, email: &Email, code: &VerificationCode) -> Result<SealedPayload> {
        let message = VerificationMessage {
            email: email.normalized(),
            code: code.as_ref().expose_secret().clone(),
        };
        let plaintext = serde_json::to_vec(&message)
            .map_err(|e| Error::unexpected("serialize verification message", e))?;

        self.hasher.encrypt(&plaintext)
    }

    async fn publish(&self, event: DomainEvent) {
        if let Err(error) = self.publisher.publish(&event).await {
            tracing::error!(
                error = ?error,
                event_type = event.event_type(),
                identity_id = %event.identity_id(),
                "Failed to publish event"
            );
        }
    }
}

fn parse_registration(request: RegisterRequest) -> Result<Registration> {
    Ok(Registration {
        username: Username::try_from(request.username)?,
        email: Email::try_from(request.email)?,
        password: Password::try_from(request.password)?,
        display_name: request.display_name,
        bio: request.bio,
        profile_image: request.profile_image,
        background_image: request.background_image,
    })
}

fn failure(operation: &'static str, error: Error) -> AuthenticationResult {
    log_unexpected(operation, &error);
    AuthenticationResult::failure(error.public_message())
}

fn log_unexpected(operation: &'static str, error: &Error) {
    if error.kind() == ErrorKind::Unexpected {
        tracing::error!(operation, error = ?error, "Unexpected failure");
    }
}
