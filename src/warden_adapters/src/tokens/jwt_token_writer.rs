use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use warden_core::{
    AccessToken, Clock, Error, Identity, IdentityId, MAX_REFRESH_TOKEN_BYTES,
    REFRESH_TOKEN_LENGTH, RefreshToken, Result, TokenConfig, TokenWriter,
    error::INVALID_REFRESH_TOKEN,
};

const INVALID_ACCESS_TOKEN: &str = "Access token is not valid";

/// Claims carried by every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email_verified: bool,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

/// HS256 access tokens and opaque random refresh tokens.
pub struct JwtTokenWriter {
    config: TokenConfig,
    clock: Arc<dyn Clock>,
}

impl JwtTokenWriter {
    pub fn new(config: TokenConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    fn secret(&self) -> &[u8] {
        self.config.secret.expose_secret().as_bytes()
    }

    /// Check signature, issuer, audience and expiry of a token minted here.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

        decode::<Claims>(token, &DecodingKey::from_secret(self.secret()), &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected access token");
                Error::bad_request(INVALID_ACCESS_TOKEN)
            })
    }
}

impl TokenWriter for JwtTokenWriter {
    fn generate_access_token(&self, identity: &Identity) -> Result<AccessToken> {
        let issued_at = self.clock.now();
        let expires_at = issued_at + self.config.access_token_ttl;

        let claims = Claims {
            sub: identity.id().to_string(),
            email_verified: identity.email_verified(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret()),
        )
        .map_err(|e| Error::unexpected("encode access token", e))?;

        Ok(AccessToken { token, expires_at })
    }

    fn generate_refresh_token(&self, identity_id: IdentityId) -> RefreshToken {
        let token: [u8; REFRESH_TOKEN_LENGTH] = rand::random();

        RefreshToken::new(
            token.to_vec(),
            identity_id,
            self.clock.now() + self.config.refresh_token_ttl,
        )
    }

    fn parse_refresh_token(&self, token: &str) -> Result<Vec<u8>> {
        // Anything longer cannot decode to an acceptable token.
        if token.is_empty() || token.len() > MAX_REFRESH_TOKEN_BYTES.div_ceil(3) * 4 {
            return Err(Error::bad_request(INVALID_REFRESH_TOKEN));
        }

        match STANDARD.decode(token) {
            Ok(bytes) if !bytes.is_empty() && bytes.len() <= MAX_REFRESH_TOKEN_BYTES => Ok(bytes),
            _ => Err(Error::bad_request(INVALID_REFRESH_TOKEN)),
        }
    }

    fn encode_refresh_token(&self, token: &RefreshToken) -> String {
        STANDARD.encode(token.token())
    }
}
