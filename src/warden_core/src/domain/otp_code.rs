use chrono::{DateTime, Utc};

use super::{hashed::SaltedHash, identity_id::IdentityId};

/// Email-verification challenge. At most one per identity.
#[derive(Debug, Clone, PartialEq)]
pub struct OtpCode {
    identity_id: IdentityId,
    code: SaltedHash,
    expires_at: DateTime<Utc>,
}

impl OtpCode {
    pub fn new(identity_id: IdentityId, code: SaltedHash, expires_at: DateTime<Utc>) -> Self {
        Self {
            identity_id,
            code,
            expires_at,
        }
    }

    pub fn identity_id(&self) -> IdentityId {
        self.identity_id
    }

    pub fn code(&self) -> &SaltedHash {
        &self.code
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
