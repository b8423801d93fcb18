use chrono::{DateTime, Utc};
use warden_core::{AccessToken, Identity, IdentityId};

/// Outcome of an authentication flow, as handed to the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationResult {
    pub success: bool,
    pub identity_id: Option<IdentityId>,
    pub email_verified: bool,
    /// `None` on success means the identity still has to verify its email.
    pub access_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl AuthenticationResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            identity_id: None,
            email_verified: false,
            access_token: None,
            expires_at: None,
            error: Some(error.into()),
        }
    }

    pub fn unverified(identity: &Identity) -> Self {
        Self {
            success: true,
            identity_id: Some(identity.id()),
            email_verified: identity.email_verified(),
            access_token: None,
            expires_at: None,
            error: None,
        }
    }

    pub fn authenticated(identity: &Identity, access_token: AccessToken) -> Self {
        Self {
            success: true,
            identity_id: Some(identity.id()),
            email_verified: identity.email_verified(),
            access_token: Some(access_token.token),
            expires_at: Some(access_token.expires_at),
            error: None,
        }
    }
}

/// Refresh token in its transport (base64) form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
