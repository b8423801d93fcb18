use rand::Rng;
use secrecy::{ExposeSecret, Secret};

use super::validation_error::ValidationError;

const CODE_LENGTH: usize = 6;

/// Plaintext one-time code sent to the user's mailbox. Only its salted hash
/// is persisted.
#[derive(Debug, Clone)]
pub struct VerificationCode(Secret<String>);

impl VerificationCode {
    pub fn generate() -> Self {
        let value: u32 = rand::rng().random_range(0..1_000_000);
        Self(Secret::from(format!("{value:06}")))
    }

    pub fn parse(code: &str) -> Result<Self, ValidationError> {
        let code = code.trim();
        if code.len() == CODE_LENGTH && code.chars().all(|c| c.is_ascii_digit()) {
            Ok(Self(Secret::from(code.to_string())))
        } else {
            Err(ValidationError::InvalidVerificationCode)
        }
    }
}

impl AsRef<Secret<String>> for VerificationCode {
    fn as_ref(&self) -> &Secret<String> {
        &self.0
    }
}

impl PartialEq for VerificationCode {
    fn eq(&self, other: &Self) -> bool {
        self.0.expose_secret() == other.0.expose_secret()
    }
}
