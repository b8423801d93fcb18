use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use argon2::{Algorithm, Argon2, Params, Version};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use secrecy::{ExposeSecret, Secret};
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;
use warden_core::{Email, Error, HashService, HashingConfig, Result, SaltedHash, SealedPayload};

/// Length of every derived key.
pub const HASH_LENGTH: usize = 64;
/// Length of the random per-hash salt.
pub const SALT_LENGTH: usize = 16;
/// Length of the peppered digest used for uniqueness lookups.
pub const UNIQUE_HASH_LENGTH: usize = 32;
const NONCE_LENGTH: usize = 12;

/// Argon2id key derivation, peppered SHA-512 digests and AES-256-GCM.
pub struct CryptoHashService {
    params: Params,
    pepper: Secret<String>,
    cipher: Aes256Gcm,
}

impl CryptoHashService {
    pub fn new(config: &HashingConfig) -> Result<Self> {
        let params = Params::new(
            config.memory_cost_kib,
            config.iterations,
            config.parallelism,
            Some(HASH_LENGTH),
        )
        .map_err(|e| Error::unexpected("argon2 parameters", e))?;

        let key = STANDARD
            .decode(config.encryption_key.expose_secret())
            .map_err(|e| Error::unexpected("decode encryption key", e))?;
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|_| Error::unexpected("encryption key", "key must be 32 bytes"))?;

        Ok(Self {
            params,
            pepper: config.pepper.clone(),
            cipher,
        })
    }

    /// Run the KDF on the blocking pool, inside the caller's span.
    #[tracing::instrument(name = "Deriving key", skip_all)]
    async fn derive(&self, secret: Secret<String>, salt: Vec<u8>) -> Result<Vec<u8>> {
        let params = self.params.clone();
        let current_span: tracing::Span = tracing::Span::current();

        tokio::task::spawn_blocking(move || {
            current_span.in_scope(|| -> Result<Vec<u8>> {
                let mut output = vec![0u8; HASH_LENGTH];
                Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                    .hash_password_into(secret.expose_secret().as_bytes(), &salt, &mut output)
                    .map_err(|e| Error::unexpected("derive key", e))?;
                Ok(output)
            })
        })
        .await
        .map_err(|e| Error::unexpected("key derivation task", e))?
    }
}

#[async_trait]
impl HashService for CryptoHashService {
    async fn hash(&self, secret: &Secret<String>) -> Result<SaltedHash> {
        let salt: [u8; SALT_LENGTH] = rand::random();
        let hash = self.derive(secret.clone(), salt.to_vec()).await?;

        Ok(SaltedHash::new(hash, salt.to_vec()))
    }

    async fn verify(&self, secret: &Secret<String>, expected: &SaltedHash) -> Result<bool> {
        let candidate = self.derive(secret.clone(), expected.salt.clone()).await?;

        Ok(candidate.ct_eq(&expected.hash).into())
    }

    /// The salt is taken from the peppered digest of the address, so equal
    /// addresses always produce equal hashes.
    async fn hash_email(&self, email: &Email) -> Result<SaltedHash> {
        let normalized = email.normalized();
        let salt = self.unique_hash(&normalized)[..SALT_LENGTH].to_vec();
        let hash = self
            .derive(Secret::from(normalized), salt.clone())
            .await?;

        Ok(SaltedHash::new(hash, salt))
    }

    fn unique_hash(&self, value: &str) -> Vec<u8> {
        let mut hasher = Sha512::new();
        hasher.update(value.trim().to_lowercase().as_bytes());
        hasher.update(self.pepper.expose_secret().as_bytes());

        hasher.finalize()[..UNIQUE_HASH_LENGTH].to_vec()
    }

    fn encrypt(&self, plaintext: &[u8]) -> Result<SealedPayload> {
        let iv: [u8; NONCE_LENGTH] = rand::random();
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&iv), plaintext)
            .map_err(|_| Error::unexpected("encrypt payload", "AES-GCM encryption failed"))?;

        Ok(SealedPayload {
            ciphertext: STANDARD.encode(ciphertext),
            iv: STANDARD.encode(iv),
        })
    }

    fn decrypt(&self, payload: &SealedPayload) -> Result<Vec<u8>> {
        let iv = STANDARD
            .decode(&payload.iv)
            .map_err(|e| Error::unexpected("decode payload iv", e))?;
        if iv.len() != NONCE_LENGTH {
            return Err(Error::unexpected("decrypt payload", "IV must be 12 bytes"));
        }
        let ciphertext = STANDARD
            .decode(&payload.ciphertext)
            .map_err(|e| Error::unexpected("decode payload ciphertext", e))?;

        self.cipher
            .decrypt(Nonce::from_slice(&iv), ciphertext.as_ref())
            .map_err(|_| Error::unexpected("decrypt payload", "AES-GCM authentication failed"))
    }
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;

    use super::*;
    use crate::test_support::fast_hashing_config;

    fn service() -> CryptoHashService {
        CryptoHashService::new(&fast_hashing_config()).unwrap()
    }

    fn secret(value: &str) -> Secret<String> {
        Secret::from(value.to_string())
    }

    fn email(value: &str) -> Email {
        Email::try_from(secret(value)).unwrap()
    }

    #[tokio::test]
    async fn hash_uses_a_fresh_salt_and_verifies() {
        let service = service();

        let first = service.hash(&secret("correct horse")).await.unwrap();
        let second = service.hash(&secret("correct horse")).await.unwrap();

        assert_eq!(first.hash.len(), HASH_LENGTH);
        assert_eq!(first.salt.len(), SALT_LENGTH);
        assert_ne!(first.salt, second.salt);
        assert_ne!(first.hash, second.hash);
        assert!(service.verify(&secret("correct horse"), &first).await.unwrap());
        assert!(!service.verify(&secret("wrong horse"), &first).await.unwrap());
    }

    #[tokio::test]
    async fn email_hash_is_deterministic_across_case_and_whitespace() {
        let service = service();

        let lower = service.hash_email(&email("alice@example.com")).await.unwrap();
        let mixed = service.hash_email(&email(" Alice@Example.COM")).await.unwrap();
        let other = service.hash_email(&email("bob@example.com")).await.unwrap();

        assert_eq!(lower, mixed);
        assert_ne!(lower.hash, other.hash);
    }

    #[test]
    fn unique_hash_depends_on_the_pepper() {
        let mut config = fast_hashing_config();
        let first = CryptoHashService::new(&config).unwrap();
        config.pepper = secret("another pepper");
        let second = CryptoHashService::new(&config).unwrap();

        let digest = first.unique_hash("alice@example.com");
        assert_eq!(digest.len(), UNIQUE_HASH_LENGTH);
        assert_eq!(digest, first.unique_hash(" ALICE@example.com "));
        assert_ne!(digest, second.unique_hash("alice@example.com"));
    }

    #[test]
    fn encryption_uses_a_fresh_iv() {
        let service = service();

        let first = service.encrypt(b"payload").unwrap();
        let second = service.encrypt(b"payload").unwrap();

        assert_ne!(first.iv, second.iv);
        assert_ne!(first.ciphertext, second.ciphertext);
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let service = service();
        let mut sealed = service.encrypt(b"payload").unwrap();
        let mut bytes = STANDARD.decode(&sealed.ciphertext).unwrap();
        bytes[0] ^= 0xff;
        sealed.ciphertext = STANDARD.encode(bytes);

        assert!(service.decrypt(&sealed).is_err());
    }

    #[test]
    fn rejects_keys_of_the_wrong_length() {
        let mut config = fast_hashing_config();
        config.encryption_key = secret(&STANDARD.encode([0u8; 16]));

        assert!(CryptoHashService::new(&config).is_err());
    }

    #[quickcheck]
    fn decrypt_inverts_encrypt(plaintext: Vec<u8>) -> bool {
        let service = service();
        let sealed = service.encrypt(&plaintext).unwrap();
        service.decrypt(&sealed).unwrap() == plaintext
    }
}
