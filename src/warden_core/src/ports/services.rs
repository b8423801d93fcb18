use async_trait::async_trait;
use secrecy::Secret;

use crate::{
    domain::{
        access_token::AccessToken,
        email::Email,
        events::DomainEvent,
        hashed::{SaltedHash, SealedPayload},
        identity::Identity,
        identity_id::IdentityId,
        profile::{ImageKind, ImageUpload, NewUser},
        refresh_token::RefreshToken,
    },
    error::Result,
    ports::unit_of_work::UnitOfWork,
};

#[async_trait]
pub trait HashService: Send + Sync {
    /// Salted key derivation with a fresh random salt.
    async fn hash(&self, secret: &Secret<String>) -> Result<SaltedHash>;
    async fn verify(&self, secret: &Secret<String>, expected: &SaltedHash) -> Result<bool>;
    /// Deterministic salted digest of the normalised address.
    async fn hash_email(&self, email: &Email) -> Result<SaltedHash>;
    /// normalise, append pepper, SHA-512, truncate.
    fn unique_hash(&self, value: &str) -> Vec<u8>;
    fn encrypt(&self, plaintext: &[u8]) -> Result<SealedPayload>;
    fn decrypt(&self, payload: &SealedPayload) -> Result<Vec<u8>>;
}

/// Stateless token minting. Pure apart from the injected clock.
pub trait TokenWriter: Send + Sync {
    fn generate_access_token(&self, identity: &Identity) -> Result<AccessToken>;
    fn generate_refresh_token(&self, identity_id: IdentityId) -> RefreshToken;
    /// Decode the transport form of a refresh token back into its bytes.
    fn parse_refresh_token(&self, token: &str) -> Result<Vec<u8>>;
    /// Transport form of a refresh token.
    fn encode_refresh_token(&self, token: &RefreshToken) -> String;
}

/// Profile creation, joined to the caller's unit of work.
#[async_trait]
pub trait UserCreator: Send + Sync {
    type Tx: UnitOfWork;

    async fn create_user(
        &self,
        tx: &mut Self::Tx,
        user: &NewUser,
        profile_image: Option<ImageUpload>,
        background_image: Option<ImageUpload>,
    ) -> Result<()>;
}

#[async_trait]
pub trait ImageService: Send + Sync {
    /// Returns the public URL of the stored image.
    async fn upload_image(
        &self,
        user_id: IdentityId,
        kind: ImageKind,
        image: ImageUpload,
    ) -> Result<String>;
    async fn delete_all_images(&self, user_id: IdentityId) -> bool;
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &DomainEvent) -> Result<()>;
}
