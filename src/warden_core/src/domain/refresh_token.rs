use chrono::{DateTime, Utc};

use super::identity_id::IdentityId;

/// Number of random bytes in a freshly minted refresh token.
pub const REFRESH_TOKEN_LENGTH: usize = 64;

/// Upper bound accepted when decoding a refresh token from transport.
pub const MAX_REFRESH_TOKEN_BYTES: usize = 1024;

#[derive(Clone, PartialEq, Eq)]
pub struct RefreshToken {
    token: Vec<u8>,
    identity_id: IdentityId,
    expiration_date: DateTime<Utc>,
}

impl RefreshToken {
    pub fn new(token: Vec<u8>, identity_id: IdentityId, expiration_date: DateTime<Utc>) -> Self {
        Self {
            token,
            identity_id,
            expiration_date,
        }
    }

    pub fn token(&self) -> &[u8] {
        &self.token
    }

    pub fn identity_id(&self) -> IdentityId {
        self.identity_id
    }

    pub fn expiration_date(&self) -> DateTime<Utc> {
        self.expiration_date
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date <= now
    }
}

// Token bytes are a credential; keep them out of logs.
impl std::fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshToken")
            .field("token", &"[REDACTED]")
            .field("identity_id", &self.identity_id)
            .field("expiration_date", &self.expiration_date)
            .finish()
    }
}
