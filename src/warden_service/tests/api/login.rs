use secrecy::Secret;
use warden_core::error::INVALID_CREDENTIALS;

use crate::helpers::TestApp;

#[tokio::test]
async fn alice_registers_verifies_and_logs_in() {
    let app = TestApp::new();
    let identity_id = app.verified_identity("alice").await;

    let (result, refresh) = app.login("alice").await;

    assert!(result.success);
    assert!(result.email_verified);
    assert_eq!(result.identity_id, Some(identity_id));
    let claims = app.claims(result.access_token.as_deref().unwrap());
    assert_eq!(claims.sub, identity_id.to_string());
    assert!(claims.email_verified);
    assert!(refresh.is_some());
}

#[tokio::test]
async fn second_login_reuses_the_active_refresh_token() {
    let app = TestApp::new();
    let identity_id = app.verified_identity("alice").await;

    let (_, first) = app.login("alice").await;
    let (_, second) = app.login("alice").await;

    assert_eq!(first.unwrap().token, second.unwrap().token);
    assert_eq!(app.database.refresh_token_count(identity_id).await, 1);
}

#[tokio::test]
async fn wrong_password_and_unknown_user_look_the_same() {
    let app = TestApp::new();
    app.verified_identity("alice").await;

    let (wrong_password, refresh) = app
        .service
        .login("alice", Secret::new("not the password".to_string()))
        .await;
    let (unknown_user, _) = app.login("bob").await;

    assert!(!wrong_password.success);
    assert!(refresh.is_none());
    assert_eq!(wrong_password.error.as_deref(), Some(INVALID_CREDENTIALS));
    assert_eq!(unknown_user.error, wrong_password.error);
}

#[tokio::test]
async fn login_survives_an_unavailable_cache() {
    let app = TestApp::new();
    app.verified_identity("alice").await;
    app.cache.set_unavailable(true);

    let (result, _) = app.login("alice").await;

    assert!(result.success);
    assert!(result.access_token.is_some());
}
