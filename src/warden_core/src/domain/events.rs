use serde::{Deserialize, Serialize};

use super::{hashed::SealedPayload, identity_id::IdentityId};

/// Events published after a successful commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    UserCreated {
        identity_id: IdentityId,
        username: String,
        verification: SealedPayload,
    },
    VerifyEmailAddress {
        identity_id: IdentityId,
        verification: SealedPayload,
    },
    UserDeleted {
        identity_id: IdentityId,
    },
}

impl DomainEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::UserCreated { .. } => "UserCreated",
            DomainEvent::VerifyEmailAddress { .. } => "VerifyEmailAddress",
            DomainEvent::UserDeleted { .. } => "UserDeleted",
        }
    }

    pub fn identity_id(&self) -> IdentityId {
        match self {
            DomainEvent::UserCreated { identity_id, .. }
            | DomainEvent::VerifyEmailAddress { identity_id, .. }
            | DomainEvent::UserDeleted { identity_id } => *identity_id,
        }
    }
}

/// Plaintext sealed into [`SealedPayload`] for the notification pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationMessage {
    pub email: String,
    pub code: String,
}
