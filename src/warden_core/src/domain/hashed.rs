use serde::{Deserialize, Serialize};

/// Output of the key-derivation function together with the salt it used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaltedHash {
    pub hash: Vec<u8>,
    pub salt: Vec<u8>,
}

impl SaltedHash {
    pub fn new(hash: Vec<u8>, salt: Vec<u8>) -> Self {
        Self { hash, salt }
    }
}

/// Symmetrically encrypted payload. Both fields are base64 so the value can
/// travel inside JSON events unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedPayload {
    pub ciphertext: String,
    pub iv: String,
}
