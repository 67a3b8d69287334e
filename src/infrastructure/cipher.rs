//! AES-256-CBC cipher for the shared secrets sent to backends
//!
//! Key and IV are fixed for the life of the process, so the same plaintext
//! always produces the same ciphertext. Backends decrypt with the same key/IV
//! pair and compare the result; a per-call random IV would break that
//! contract. Ciphertext is therefore not semantically secure and must not be
//! used for anything beyond this shared-secret check.

use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use std::fmt;
use thiserror::Error;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

pub const KEY_LEN: usize = 32;
pub const IV_LEN: usize = 16;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CipherError {
    #[error("cipher key is not configured")]
    MissingKey,

    #[error("cipher IV is not configured")]
    MissingIv,

    #[error("cipher key must be {KEY_LEN} bytes or {} hex characters", KEY_LEN * 2)]
    InvalidKeyLength,

    #[error("cipher IV must be {IV_LEN} bytes or {} hex characters", IV_LEN * 2)]
    InvalidIvLength,

    #[error("ciphertext is not valid hex: {0}")]
    InvalidHex(String),

    #[error("ciphertext could not be decrypted")]
    Decryption,

    #[error("decrypted text is not valid UTF-8")]
    InvalidUtf8,
}

/// Deterministic symmetric cipher with process-wide key material
#[derive(Clone)]
pub struct SecretCipher {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretCipher")
            .field("key", &"***")
            .field("iv", &"***")
            .finish()
    }
}

impl SecretCipher {
    pub fn new(key: [u8; KEY_LEN], iv: [u8; IV_LEN]) -> Self {
        Self { key, iv }
    }

    /// Build from configuration strings
    ///
    /// Each value is either the raw string (32 bytes for the key, 16 for the
    /// IV) or its hex encoding.
    pub fn from_config(key: Option<&str>, iv: Option<&str>) -> Result<Self, CipherError> {
        let key = key
            .filter(|k| !k.is_empty())
            .ok_or(CipherError::MissingKey)?;
        let iv = iv.filter(|v| !v.is_empty()).ok_or(CipherError::MissingIv)?;

        let key = decode_material::<KEY_LEN>(key).ok_or(CipherError::InvalidKeyLength)?;
        let iv = decode_material::<IV_LEN>(iv).ok_or(CipherError::InvalidIvLength)?;

        Ok(Self::new(key, iv))
    }

    /// Encrypt to lower-case hex
    pub fn encrypt(&self, plaintext: &str) -> String {
        let ciphertext = Aes256CbcEnc::new(&self.key.into(), &self.iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        hex::encode(ciphertext)
    }

    pub fn decrypt(&self, ciphertext_hex: &str) -> Result<String, CipherError> {
        let ciphertext =
            hex::decode(ciphertext_hex).map_err(|e| CipherError::InvalidHex(e.to_string()))?;
        let plaintext = Aes256CbcDec::new(&self.key.into(), &self.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| CipherError::Decryption)?;
        String::from_utf8(plaintext).map_err(|_| CipherError::InvalidUtf8)
    }
}

fn decode_material<const N: usize>(value: &str) -> Option<[u8; N]> {
    if value.len() == N {
        return value.as_bytes().try_into().ok();
    }
    if value.len() == N * 2 {
        return hex::decode(value).ok()?.try_into().ok();
    }
    None
}
