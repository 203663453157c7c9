//! Codec contract mapping pipeline types to and from bytes.

use crate::errors::KeywrightError;
use crate::license::License;
use crate::repository::RepositoryModel;

/// Encodes and decodes the two types that travel through the license
/// pipeline: the license bean and the repository model.
///
/// Implementations must round-trip both types losslessly; the key generator
/// additionally relies on an encode/decode pass as its defensive-copy
/// mechanism.
pub trait Codec: Send + Sync {
    /// Encodes a license bean.
    fn encode_license(&self, license: &License) -> Result<Vec<u8>, KeywrightError>;

    /// Decodes a license bean.
    fn decode_license(&self, data: &[u8]) -> Result<License, KeywrightError>;

    /// Encodes a repository model.
    fn encode_repository(&self, model: &RepositoryModel) -> Result<Vec<u8>, KeywrightError>;

    /// Decodes a repository model.
    fn decode_repository(&self, data: &[u8]) -> Result<RepositoryModel, KeywrightError>;
}

/// JSON codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode_license(&self, license: &License) -> Result<Vec<u8>, KeywrightError> {
        serde_json::to_vec(license).map_err(|e| KeywrightError::Codec(e.to_string()))
    }

    fn decode_license(&self, data: &[u8]) -> Result<License, KeywrightError> {
        serde_json::from_slice(data).map_err(|e| KeywrightError::Codec(e.to_string()))
    }

    fn encode_repository(&self, model: &RepositoryModel) -> Result<Vec<u8>, KeywrightError> {
        serde_json::to_vec(model).map_err(|e| KeywrightError::Codec(e.to_string()))
    }

    fn decode_repository(&self, data: &[u8]) -> Result<RepositoryModel, KeywrightError> {
        serde_json::from_slice(data).map_err(|e| KeywrightError::Codec(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn license_roundtrip() {
        let mut license = License::default();
        license.holder = Some("CN=Alice".to_string());
        license.issued = Some(Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap());

        let bytes = JsonCodec.encode_license(&license).unwrap();
        assert_eq!(JsonCodec.decode_license(&bytes).unwrap(), license);
    }

    #[test]
    fn repository_roundtrip() {
        let model = RepositoryModel {
            algorithm: "ed25519".to_string(),
            artifact: "YXJ0aWZhY3Q=".to_string(),
            signature: "c2lnbmF0dXJl".to_string(),
        };
        let bytes = JsonCodec.encode_repository(&model).unwrap();
        assert_eq!(JsonCodec.decode_repository(&bytes).unwrap(), model);
    }

    #[test]
    fn garbage_decodes_to_codec_error() {
        let result = JsonCodec.decode_license(b"\x00\x01 not json");
        assert!(matches!(result, Err(KeywrightError::Codec(_))));
    }
}
