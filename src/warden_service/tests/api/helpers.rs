use std::sync::Arc;

use chrono::Utc;
use secrecy::Secret;
use warden_adapters::{
    crypto::CryptoHashService,
    events::RecordingEventPublisher,
    images::InMemoryImageService,
    persistence::{HashMapCacheStore, InMemoryDatabase, InMemoryUnitOfWork},
    telemetry::init_test_tracing,
    test_support::core_config,
    tokens::{Claims, JwtTokenWriter},
};
use warden_application::{AuthService, AuthenticationResult, RegisterRequest};
use warden_core::{
    DomainEvent, HashService, IdentityId, ImageUpload, ManualClock, VerificationMessage,
};
use warden_service::in_memory_auth_service;

pub const PASSWORD: &str = "correct horse battery";

/// The full decorator chain over in-memory storage, with handles on every
/// side effect.
pub struct TestApp {
    pub service: AuthService<InMemoryUnitOfWork>,
    pub database: InMemoryDatabase,
    pub cache: HashMapCacheStore,
    pub images: InMemoryImageService,
    pub events: RecordingEventPublisher,
    pub clock: Arc<ManualClock>,
    hasher: CryptoHashService,
    tokens: JwtTokenWriter,
}

impl TestApp {
    pub fn new() -> Self {
        init_test_tracing();

        let config = core_config();
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let database = InMemoryDatabase::with_clock(clock.clone());
        let cache = HashMapCacheStore::new();
        let images = InMemoryImageService::default();
        let events = RecordingEventPublisher::new();

        let service = in_memory_auth_service(
            &database,
            Arc::new(cache.clone()),
            Arc::new(images.clone()),
            Arc::new(events.clone()),
            clock.clone(),
            &config,
        )
        .expect("Failed to assemble auth service");

        Self {
            service,
            database,
            cache,
            images,
            events,
            hasher: CryptoHashService::new(&config.hashing).expect("Invalid hashing config"),
            tokens: JwtTokenWriter::new(config.token, clock.clone()),
            clock,
        }
    }

    pub fn request(username: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: Secret::new(format!("{username}@example.com")),
            password: Secret::new(PASSWORD.to_string()),
            display_name: username.to_string(),
            bio: Some(format!("Hi, I'm {username}")),
            profile_image: None,
            background_image: None,
        }
    }

    pub fn png() -> ImageUpload {
        ImageUpload {
            content_type: "image/png".to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    pub async fn register(&self, username: &str) -> AuthenticationResult {
        self.service.register(Self::request(username)).await
    }

    pub async fn login(
        &self,
        username: &str,
    ) -> (AuthenticationResult, Option<warden_application::RefreshTokenResponse>) {
        self.service
            .login(username, Secret::new(PASSWORD.to_string()))
            .await
    }

    /// Decrypted payload of the most recent verification event.
    pub async fn last_verification(&self) -> VerificationMessage {
        let sealed = self
            .events
            .events()
            .await
            .into_iter()
            .rev()
            .find_map(|event| match event {
                DomainEvent::UserCreated { verification, .. }
                | DomainEvent::VerifyEmailAddress { verification, .. } => Some(verification),
                DomainEvent::UserDeleted { .. } => None,
            })
            .expect("No verification event was published");

        let plaintext = self.hasher.decrypt(&sealed).expect("Undecryptable payload");
        serde_json::from_slice(&plaintext).expect("Malformed verification message")
    }

    /// Register and verify `username`, returning its id.
    pub async fn verified_identity(&self, username: &str) -> IdentityId {
        let registered = self.register(username).await;
        let identity_id = registered.identity_id.expect("Registration failed");
        let code = self.last_verification().await.code;

        assert!(self.service.verify_email(identity_id, &code).await);
        identity_id
    }

    pub fn claims(&self, access_token: &str) -> Claims {
        self.tokens
            .validate_access_token(access_token)
            .expect("Access token did not validate")
    }
}
