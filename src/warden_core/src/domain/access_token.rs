use chrono::{DateTime, Utc};

/// Signed, short-lived claim set. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
