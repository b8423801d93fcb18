use secrecy::Secret;
use warden_core::DomainEvent;

use crate::helpers::TestApp;

#[tokio::test]
async fn correct_code_verifies_and_consumes_the_otp() {
    let app = TestApp::new();
    let identity_id = app.register("alice").await.identity_id.unwrap();
    let code = app.last_verification().await.code;

    assert!(app.service.verify_email(identity_id, &code).await);

    assert!(!app.database.has_otp(identity_id).await);
    let (result, _) = app.login("alice").await;
    assert!(result.email_verified);
    assert!(!app.service.verify_email(identity_id, &code).await);
}

#[tokio::test]
async fn wrong_code_leaves_identity_unverified() {
    let app = TestApp::new();
    let identity_id = app.register("alice").await.identity_id.unwrap();
    let code = app.last_verification().await.code;
    let wrong = if code == "000000" { "111111" } else { "000000" };

    assert!(!app.service.verify_email(identity_id, wrong).await);

    assert!(app.database.has_otp(identity_id).await);
    let (result, refresh) = app.login("alice").await;
    assert!(result.success);
    assert!(result.access_token.is_none());
    assert!(refresh.is_none());
}

#[tokio::test]
async fn expired_code_is_rejected() {
    let app = TestApp::new();
    let identity_id = app.register("alice").await.identity_id.unwrap();
    let code = app.last_verification().await.code;

    app.clock.advance(chrono::Duration::minutes(16));

    assert!(!app.service.verify_email(identity_id, &code).await);
    assert!(app.database.has_otp(identity_id).await);
}

#[tokio::test]
async fn resend_replaces_the_code() {
    let app = TestApp::new();
    let identity_id = app.register("alice").await.identity_id.unwrap();
    let first = app.last_verification().await.code;

    assert!(
        app.service
            .resend_verification_code(identity_id, Secret::new("alice@example.com".to_string()))
            .await
    );

    let events = app.events.events().await;
    assert!(matches!(
        events.last(),
        Some(DomainEvent::VerifyEmailAddress { identity_id: id, .. }) if *id == identity_id
    ));
    let second = app.last_verification().await.code;
    if first != second {
        assert!(!app.service.verify_email(identity_id, &first).await);
    }
    assert!(app.service.verify_email(identity_id, &second).await);
}
