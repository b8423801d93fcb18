use serde::{Deserialize, Serialize};

use super::{hashed::SaltedHash, identity_id::IdentityId, username::Username};

/// Authentication root: credentials plus email verification state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    id: IdentityId,
    username: Username,
    password: SaltedHash,
    email: SaltedHash,
    email_verified: bool,
}

impl Identity {
    /// A freshly registered identity. Email starts unverified.
    pub fn new(id: IdentityId, username: Username, password: SaltedHash, email: SaltedHash) -> Self {
        Self {
            id,
            username,
            password,
            email,
            email_verified: false,
        }
    }

    /// Rehydrate an identity from storage.
    pub fn from_parts(
        id: IdentityId,
        username: Username,
        password: SaltedHash,
        email: SaltedHash,
        email_verified: bool,
    ) -> Self {
        Self {
            id,
            username,
            password,
            email,
            email_verified,
        }
    }

    pub fn id(&self) -> IdentityId {
        self.id
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn password(&self) -> &SaltedHash {
        &self.password
    }

    pub fn email(&self) -> &SaltedHash {
        &self.email
    }

    pub fn email_verified(&self) -> bool {
        self.email_verified
    }

    pub fn into_verified(self) -> Self {
        Self {
            email_verified: true,
            ..self
        }
    }
}
