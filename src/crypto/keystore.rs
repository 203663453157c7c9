//! JSON keystore holding Ed25519 key material.
//!
//! A keystore maps aliases to entries. Every entry carries the hex-encoded
//! verifying key in the clear; a sealed signing seed (password-based AEAD,
//! see [`crate::crypto::encrypt`]) is present only in stores meant to
//! generate license keys. A verify-only keystore is what a consumer-only
//! deployment ships.

use crate::errors::KeywrightError;
use crate::passwd::Password;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Store type tag of the JSON keystore format.
pub const JSON_KEYSTORE_TYPE: &str = "json";

/// Algorithm name of Ed25519 entries.
pub const ED25519: &str = "ed25519";

/// A keyed collection of signing and verifying key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keystore {
    /// Store type tag; checked against the requested store type on load.
    #[serde(rename = "type")]
    pub store_type: String,

    /// Entries by alias.
    pub entries: BTreeMap<String, KeystoreEntry>,
}

/// A single aliased key entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeystoreEntry {
    /// Signature algorithm of this entry.
    pub algorithm: String,

    /// Hex-encoded 32-byte Ed25519 verifying key.
    pub verifying_key: String,

    /// Base64 of the password-sealed 32-byte signing seed, if this entry
    /// can sign.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_key: Option<String>,
}

impl Keystore {
    /// Creates an empty JSON keystore.
    pub fn new() -> Self {
        Self {
            store_type: JSON_KEYSTORE_TYPE.to_string(),
            entries: BTreeMap::new(),
        }
    }

    /// Parses a keystore and checks its type tag.
    pub fn load(data: &[u8], expected_type: &str) -> Result<Self, KeywrightError> {
        let keystore: Keystore = serde_json::from_slice(data)
            .map_err(|e| KeywrightError::Authentication(format!("keystore unreadable: {}", e)))?;
        if !keystore.store_type.eq_ignore_ascii_case(expected_type) {
            return Err(KeywrightError::Authentication(format!(
                "keystore type mismatch: expected {:?}, found {:?}",
                expected_type, keystore.store_type
            )));
        }
        Ok(keystore)
    }

    /// Serializes the keystore.
    pub fn save(&self) -> Result<Vec<u8>, KeywrightError> {
        serde_json::to_vec_pretty(self).map_err(|e| KeywrightError::Unexpected(e.to_string()))
    }

    /// Looks up an entry by alias.
    pub fn entry(&self, alias: &str) -> Result<&KeystoreEntry, KeywrightError> {
        self.entries.get(alias).ok_or_else(|| {
            KeywrightError::Authentication(format!("no keystore entry for alias {:?}", alias))
        })
    }

    /// Generates a fresh Ed25519 entry under `alias`, sealing the signing
    /// seed with `password`.
    pub fn generate_entry(
        &mut self,
        alias: &str,
        password: &Password,
    ) -> Result<(), KeywrightError> {
        let signing_key = SigningKey::generate(&mut rand::rngs::OsRng);
        let sealed = super::encrypt::seal(password, signing_key.as_bytes())?;
        self.entries.insert(
            alias.to_string(),
            KeystoreEntry {
                algorithm: ED25519.to_string(),
                verifying_key: hex::encode(signing_key.verifying_key().as_bytes()),
                signing_key: Some(STANDARD.encode(sealed)),
            },
        );
        Ok(())
    }

    /// Returns a copy with all signing seeds stripped, suitable for
    /// shipping to consumer-only deployments.
    pub fn verify_only(&self) -> Keystore {
        let mut copy = self.clone();
        for entry in copy.entries.values_mut() {
            entry.signing_key = None;
        }
        copy
    }
}

impl Default for Keystore {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes a hex-encoded Ed25519 verifying key.
pub(crate) fn decode_verifying_key(hex_key: &str) -> Result<VerifyingKey, KeywrightError> {
    let bytes = hex::decode(hex_key)
        .map_err(|e| KeywrightError::Authentication(format!("invalid verifying key hex: {}", e)))?;
    let key: [u8; 32] = bytes
        .try_into()
        .map_err(|_| KeywrightError::Authentication("verifying key must be 32 bytes".into()))?;
    VerifyingKey::from_bytes(&key)
        .map_err(|e| KeywrightError::Authentication(format!("invalid Ed25519 verifying key: {}", e)))
}

/// Unseals the signing seed of an entry.
pub(crate) fn unseal_signing_key(
    entry: &KeystoreEntry,
    password: &Password,
) -> Result<SigningKey, KeywrightError> {
    let sealed = entry.signing_key.as_ref().ok_or_else(|| {
        KeywrightError::Authentication("keystore entry has no signing key".to_string())
    })?;
    let sealed = STANDARD.decode(sealed).map_err(|e| {
        KeywrightError::Authentication(format!("malformed sealed signing key: {}", e))
    })?;
    let seed = super::encrypt::open(password, &sealed)?;
    let seed: [u8; 32] = seed
        .try_into()
        .map_err(|_| KeywrightError::Authentication("signing seed must be 32 bytes".into()))?;
    Ok(SigningKey::from_bytes(&seed))
}
