use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Barrier;
use warden_adapters::{
    events::RecordingEventPublisher,
    images::InMemoryImageService,
    persistence::{HashMapCacheStore, InMemoryDatabase, InMemoryUnitOfWork, InMemoryUserCreator},
    test_support::core_config,
};
use warden_core::{
    DomainEvent, ImageUpload, ManualClock, NewUser, Result, UserCreator,
    error::{USERNAME_ALREADY_EXISTS, UNEXPECTED_ERROR},
};
use warden_service::{Infrastructure, build_auth_service, decorate};

use crate::helpers::TestApp;

/// Holds every registration inside its open transaction until `barrier`
/// registrations have staged their identity.
struct RendezvousUserCreator {
    inner: InMemoryUserCreator,
    barrier: Barrier,
}

#[async_trait]
impl UserCreator for RendezvousUserCreator {
    type Tx = InMemoryUnitOfWork;

    async fn create_user(
        &self,
        tx: &mut Self::Tx,
        user: &NewUser,
        profile_image: Option<ImageUpload>,
        background_image: Option<ImageUpload>,
    ) -> Result<()> {
        self.barrier.wait().await;
        self.inner
            .create_user(tx, user, profile_image, background_image)
            .await
    }
}

#[tokio::test]
async fn register_returns_unverified_identity_and_publishes_user_created() {
    let app = TestApp::new();

    let result = app.register("alice").await;

    assert!(result.success);
    assert!(!result.email_verified);
    assert!(result.access_token.is_none());
    let identity_id = result.identity_id.unwrap();
    assert!(app.database.has_profile(identity_id).await);
    assert!(app.database.has_otp(identity_id).await);

    let events = app.events.events().await;
    assert!(matches!(
        events.as_slice(),
        [DomainEvent::UserCreated { identity_id: id, username, .. }]
            if *id == identity_id && username == "alice"
    ));

    let message = app.last_verification().await;
    assert_eq!(message.email, "alice@example.com");
    assert_eq!(message.code.len(), 6);
}

#[tokio::test]
async fn duplicate_username_is_reported_through_the_resilience_layer() {
    let app = TestApp::new();
    app.register("alice").await;

    let result = app.register("alice").await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some(USERNAME_ALREADY_EXISTS));
    assert_ne!(result.error.as_deref(), Some(UNEXPECTED_ERROR));
    assert_eq!(app.database.identity_count().await, 1);
    assert_eq!(app.events.events().await.len(), 1);
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = TestApp::new();
    app.register("alice").await;

    let mut request = TestApp::request("alice2");
    request.email = TestApp::request("alice").email;
    let result = app.service.register(request).await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Email already exists"));
}

#[tokio::test]
async fn invalid_profile_image_rolls_back_the_identity() {
    let app = TestApp::new();
    let mut request = TestApp::request("alice");
    request.profile_image = Some(warden_core::ImageUpload {
        content_type: "text/plain".to_string(),
        bytes: b"not an image".to_vec(),
    });

    let result = app.service.register(request).await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("Profile image is not a valid image")
    );
    assert_eq!(app.database.identity_count().await, 0);
    assert!(app.events.events().await.is_empty());
}

#[tokio::test]
async fn uploaded_images_are_linked_to_the_profile() {
    let app = TestApp::new();
    let mut request = TestApp::request("alice");
    request.profile_image = Some(TestApp::png());
    request.background_image = Some(TestApp::png());

    let identity_id = app.service.register(request).await.identity_id.unwrap();

    let urls = app.database.profile_image_urls(identity_id).await.unwrap();
    assert!(urls.profile.is_some());
    assert!(urls.background.is_some());
    assert_eq!(app.images.image_count(identity_id).await, 2);
}

#[tokio::test]
async fn malformed_input_is_rejected_before_storage() {
    let app = TestApp::new();
    let mut request = TestApp::request("alice");
    request.email = secrecy::Secret::new("not-an-email".to_string());

    let result = app.service.register(request).await;

    assert!(!result.success);
    assert!(result.error.is_some());
    assert_eq!(app.database.identity_count().await, 0);
}

#[tokio::test]
async fn concurrent_registrations_of_one_username_report_the_duplicate() {
    let config = core_config();
    let database = InMemoryDatabase::new();
    let images = InMemoryImageService::default();
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let store = decorate(
        database.transaction_manager(),
        database.identity_repository(),
        database.otp_repository(),
        database.refresh_token_repository(),
        Arc::new(HashMapCacheStore::new()),
        &config.cache,
        clock.clone(),
    );
    let service = build_auth_service(
        Infrastructure {
            store,
            users: Arc::new(RendezvousUserCreator {
                inner: database.user_creator_with_images(Arc::new(images.clone())),
                barrier: Barrier::new(2),
            }),
            images: Arc::new(images.clone()),
            publisher: Arc::new(RecordingEventPublisher::new()),
            clock,
        },
        &config,
    )
    .unwrap();

    let mut first = TestApp::request("alice");
    first.profile_image = Some(TestApp::png());
    let mut second = TestApp::request("alice");
    second.email = secrecy::Secret::new("someone-else@example.com".to_string());
    second.profile_image = Some(TestApp::png());

    let (first, second) = tokio::join!(service.register(first), service.register(second));

    assert_eq!(
        [first.success, second.success].iter().filter(|s| **s).count(),
        1
    );
    let loser = if first.success { second } else { first };
    assert_eq!(loser.error.as_deref(), Some(USERNAME_ALREADY_EXISTS));
    assert_eq!(database.identity_count().await, 1);
    // Only the winner keeps its uploaded image.
    assert_eq!(images.total_count().await, 1);
}
