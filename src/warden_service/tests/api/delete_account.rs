use warden_core::DomainEvent;
use warden_adapters::decorators::IDENTITIES_CACHE_KEY;

use crate::helpers::TestApp;

#[tokio::test]
async fn delete_removes_identity_tokens_and_images() {
    let app = TestApp::new();
    let mut request = TestApp::request("alice");
    request.profile_image = Some(TestApp::png());
    let identity_id = app.service.register(request).await.identity_id.unwrap();
    let code = app.last_verification().await.code;
    assert!(app.service.verify_email(identity_id, &code).await);
    let (_, refresh) = app.login("alice").await;

    assert!(app.service.delete_by_id(identity_id).await);

    assert_eq!(app.database.identity_count().await, 0);
    assert_eq!(app.database.refresh_token_count(identity_id).await, 0);
    assert_eq!(app.images.image_count(identity_id).await, 0);
    assert_eq!(app.cache.field_count(IDENTITIES_CACHE_KEY).await, 0);
    assert!(
        !app.service
            .refresh_access_token(&refresh.unwrap().token)
            .await
            .success
    );
    assert!(matches!(
        app.events.events().await.last(),
        Some(DomainEvent::UserDeleted { identity_id: id }) if *id == identity_id
    ));
}

#[tokio::test]
async fn deleted_identity_cannot_log_in() {
    let app = TestApp::new();
    let identity_id = app.verified_identity("alice").await;
    app.login("alice").await;

    app.service.delete_by_id(identity_id).await;

    let (result, _) = app.login("alice").await;
    assert!(!result.success);
}

#[tokio::test]
async fn deleting_an_unknown_identity_fails() {
    let app = TestApp::new();

    assert!(!app.service.delete_by_id(warden_core::IdentityId::new()).await);
    assert!(app.events.events().await.is_empty());
}
