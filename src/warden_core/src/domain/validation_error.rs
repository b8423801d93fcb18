use thiserror::Error;

use crate::error::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Username must be 3-32 characters of letters, digits, '_' or '.'")]
    InvalidUsername,
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Password must be at least 8 characters long")]
    InvalidPassword,
    #[error("Verification code must be 6 digits")]
    InvalidVerificationCode,
}

impl From<ValidationError> for Error {
    fn from(error: ValidationError) -> Self {
        Error::BadRequest(error.to_string())
    }
}
