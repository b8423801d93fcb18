use warden_core::error::INVALID_REFRESH_TOKEN;

use crate::helpers::TestApp;

#[tokio::test]
async fn refresh_mints_a_token_for_the_same_identity() {
    let app = TestApp::new();
    let identity_id = app.verified_identity("alice").await;
    let (_, refresh) = app.login("alice").await;

    let result = app
        .service
        .refresh_access_token(&refresh.unwrap().token)
        .await;

    assert!(result.success);
    let claims = app.claims(result.access_token.as_deref().unwrap());
    assert_eq!(claims.sub, identity_id.to_string());
}

#[tokio::test]
async fn empty_refresh_token_is_not_valid() {
    let app = TestApp::new();

    let result = app.service.refresh_access_token("").await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some(INVALID_REFRESH_TOKEN));
}

#[tokio::test]
async fn oversized_and_non_base64_tokens_are_not_valid() {
    let app = TestApp::new();

    for token in ["A".repeat(2000), "%%% not base64 %%%".to_string()] {
        let result = app.service.refresh_access_token(&token).await;
        assert_eq!(result.error.as_deref(), Some(INVALID_REFRESH_TOKEN));
    }
}

#[tokio::test]
async fn revoked_token_can_no_longer_refresh() {
    let app = TestApp::new();
    app.verified_identity("alice").await;
    let (_, refresh) = app.login("alice").await;
    let token = refresh.unwrap().token;

    assert!(app.service.revoke_refresh_token(&token).await);

    let result = app.service.refresh_access_token(&token).await;
    assert!(!result.success);
    assert!(!app.service.revoke_refresh_token(&token).await);
}

#[tokio::test]
async fn expired_token_is_replaced_on_next_login() {
    let app = TestApp::new();
    app.verified_identity("alice").await;
    let (_, first) = app.login("alice").await;
    let first = first.unwrap().token;

    app.clock.advance(chrono::Duration::days(31));

    assert!(!app.service.refresh_access_token(&first).await.success);
    let (_, second) = app.login("alice").await;
    assert_ne!(second.unwrap().token, first);
}
