pub mod auth_service;
pub mod identity_service;
pub mod responses;

pub use auth_service::{AuthService, RegisterRequest};
pub use identity_service::{IdentityService, Registration};
pub use responses::{AuthenticationResult, RefreshTokenResponse};
