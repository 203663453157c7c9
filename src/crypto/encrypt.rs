//! Password-based encryption for license artifacts.
//!
//! The wire layout is `salt || nonce || ciphertext`: a fresh random salt
//! feeds Argon2id to derive the key, a fresh random nonce feeds
//! ChaCha20-Poly1305, and the AEAD tag rides at the end of the ciphertext.
//! Encrypting requests the password with write usage (so the password
//! policy runs); decrypting requests it with read usage.

use crate::errors::KeywrightError;
use crate::io::Transformation;
use crate::passwd::{Password, PasswordProtection, PasswordUsage};
use argon2::{Argon2, Params, Version};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use std::sync::Arc;
use zeroize::Zeroizing;

/// Algorithm name of the password-based ChaCha20-Poly1305 encryption.
pub const CHACHA20_POLY1305: &str = "chacha20-poly1305";

const KEY_LEN: usize = 32;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

// OWASP Argon2id recommendations (2023).
const MEMORY_COST_KIB: u32 = 19 * 1024;
const TIME_COST: u32 = 2;
const PARALLELISM: u32 = 1;

fn derive_key(password: &Password, salt: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>, KeywrightError> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, Some(KEY_LEN))
        .map_err(|e| KeywrightError::Unexpected(format!("key derivation setup: {}", e)))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key[..])
        .map_err(|e| KeywrightError::Unexpected(format!("key derivation: {}", e)))?;
    Ok(key)
}

/// Seals `plaintext` under `password` as `salt || nonce || ciphertext`.
pub(crate) fn seal(password: &Password, plaintext: &[u8]) -> Result<Vec<u8>, KeywrightError> {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    let key = derive_key(password, &salt)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let cipher = ChaCha20Poly1305::new((&*key).into());
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| KeywrightError::Unexpected(format!("encryption: {}", e)))?;

    let mut out = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&salt);
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Opens data sealed by [`seal`].
pub(crate) fn open(password: &Password, data: &[u8]) -> Result<Vec<u8>, KeywrightError> {
    if data.len() < SALT_LEN + NONCE_LEN + TAG_LEN {
        return Err(KeywrightError::Authentication(
            "encrypted data too short".to_string(),
        ));
    }
    let (salt, rest) = data.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);
    let key = derive_key(password, salt)?;

    let cipher = ChaCha20Poly1305::new((&*key).into());
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| {
            KeywrightError::Authentication(
                "decryption failed (wrong password or tampered data)".to_string(),
            )
        })
}

/// Password-based AEAD transformation over license artifacts.
pub struct PbeEncryption {
    protection: Arc<dyn PasswordProtection>,
}

impl PbeEncryption {
    /// Encryption bound to the given password protection.
    pub fn new(protection: Arc<dyn PasswordProtection>) -> Self {
        Self { protection }
    }
}

impl Transformation for PbeEncryption {
    fn apply(&self, data: &[u8]) -> Result<Vec<u8>, KeywrightError> {
        let password = self.protection.password(PasswordUsage::Write)?;
        seal(&password, data)
    }

    fn unapply(&self, data: &[u8]) -> Result<Vec<u8>, KeywrightError> {
        let password = self.protection.password(PasswordUsage::Read)?;
        open(&password, data)
    }
}

/// Parameters for building an encryption transformation.
pub struct EncryptionParameters {
    /// Algorithm name; defaults to the context's encryption algorithm when
    /// built through the manager builders.
    pub algorithm: String,
    /// Password protection for the encryption secret.
    pub protection: Arc<dyn PasswordProtection>,
}

/// Builds encryption transformations from parameters.
pub trait EncryptionFactory: Send + Sync {
    /// Builds the transformation for the given parameters.
    fn transformation(
        &self,
        parameters: EncryptionParameters,
    ) -> Result<Arc<dyn Transformation>, KeywrightError>;
}

/// The standard encryption factory, recognizing
/// [`CHACHA20_POLY1305`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardEncryptionFactory;

impl EncryptionFactory for StandardEncryptionFactory {
    fn transformation(
        &self,
        parameters: EncryptionParameters,
    ) -> Result<Arc<dyn Transformation>, KeywrightError> {
        if parameters.algorithm.eq_ignore_ascii_case(CHACHA20_POLY1305) {
            Ok(Arc::new(PbeEncryption::new(parameters.protection)))
        } else {
            Err(KeywrightError::Config(format!(
                "unsupported encryption algorithm: {:?}",
                parameters.algorithm
            )))
        }
    }
}
