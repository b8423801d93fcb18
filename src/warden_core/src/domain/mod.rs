pub mod access_token;
pub mod email;
pub mod events;
pub mod hashed;
pub mod identity;
pub mod identity_id;
pub mod otp_code;
pub mod password;
pub mod profile;
pub mod refresh_token;
pub mod username;
pub mod validation_error;
pub mod verification_code;
