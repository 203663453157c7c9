//! Repository model: the signed container inside every license key.
//!
//! A license key is a repository model pushed through the codec, compression,
//! and encryption. The model carries the codec-encoded license bean (the
//! artifact) together with a detached signature over it; the controller
//! mediates between an [`Authentication`](crate::auth::Authentication)
//! backend doing the actual cryptography and the model storing its results.

use crate::codec::Codec;
use crate::errors::KeywrightError;
use crate::license::License;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Container carrying a signed, codec-encoded license bean.
///
/// All three fields are text on the wire: the algorithm by name, artifact
/// and signature as base64.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RepositoryModel {
    /// Name of the signature algorithm, e.g. `"ed25519"`.
    #[serde(default)]
    pub algorithm: String,

    /// Base64 of the codec-encoded license bean.
    #[serde(default)]
    pub artifact: String,

    /// Base64 of the detached signature over the artifact bytes.
    #[serde(default)]
    pub signature: String,
}

/// Yields the verified (or freshly signed) license artifact.
#[derive(Clone)]
pub struct Decoder {
    artifact: Vec<u8>,
    codec: Arc<dyn Codec>,
}

impl Decoder {
    pub(crate) fn new(artifact: Vec<u8>, codec: Arc<dyn Codec>) -> Self {
        Self { artifact, codec }
    }

    /// Decodes the license bean from the verified artifact bytes.
    pub fn license(&self) -> Result<License, KeywrightError> {
        self.codec.decode_license(&self.artifact)
    }
}

impl fmt::Debug for Decoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoder")
            .field("artifact_len", &self.artifact.len())
            .finish()
    }
}

/// Binds a repository model to a codec for signing or verification.
pub struct RepositoryController {
    model: RepositoryModel,
    codec: Arc<dyn Codec>,
}

impl RepositoryController {
    /// Creates a controller over the given model.
    pub fn new(model: RepositoryModel, codec: Arc<dyn Codec>) -> Self {
        Self { model, codec }
    }

    /// The current model.
    pub fn model(&self) -> &RepositoryModel {
        &self.model
    }

    /// Consumes the controller, returning the (possibly signed) model.
    pub fn into_model(self) -> RepositoryModel {
        self.model
    }

    /// Encodes the license, records the artifact and the signature produced
    /// by `sign`, and returns a decoder over the artifact bytes.
    pub fn sign_with<F>(
        &mut self,
        algorithm: &str,
        license: &License,
        sign: F,
    ) -> Result<Decoder, KeywrightError>
    where
        F: FnOnce(&[u8]) -> Result<Vec<u8>, KeywrightError>,
    {
        let artifact = self.codec.encode_license(license)?;
        let signature = sign(&artifact)?;
        self.model.algorithm = algorithm.to_string();
        self.model.artifact = STANDARD.encode(&artifact);
        self.model.signature = STANDARD.encode(signature);
        Ok(Decoder::new(artifact, self.codec.clone()))
    }

    /// Checks the algorithm name, runs `verify` over the decoded artifact
    /// and signature bytes, and returns a decoder over the artifact.
    pub fn verify_with<F>(&self, algorithm: &str, verify: F) -> Result<Decoder, KeywrightError>
    where
        F: FnOnce(&[u8], &[u8]) -> Result<(), KeywrightError>,
    {
        if !self.model.algorithm.eq_ignore_ascii_case(algorithm) {
            return Err(KeywrightError::Authentication(format!(
                "signature algorithm mismatch: expected {:?}, found {:?}",
                algorithm, self.model.algorithm
            )));
        }
        let artifact = STANDARD.decode(&self.model.artifact).map_err(|e| {
            KeywrightError::Authentication(format!("malformed artifact encoding: {}", e))
        })?;
        let signature = STANDARD.decode(&self.model.signature).map_err(|e| {
            KeywrightError::Authentication(format!("malformed signature encoding: {}", e))
        })?;
        verify(&artifact, &signature)?;
        Ok(Decoder::new(artifact, self.codec.clone()))
    }
}

/// Produces repository models and controllers for the pipeline.
pub trait RepositoryContext: Send + Sync {
    /// Returns a fresh, empty model.
    fn model(&self) -> RepositoryModel;

    /// Binds a model to a codec.
    fn controller(&self, model: RepositoryModel, codec: Arc<dyn Codec>) -> RepositoryController {
        RepositoryController::new(model, codec)
    }
}

/// The standard repository layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardRepositoryContext;

impl RepositoryContext for StandardRepositoryContext {
    fn model(&self) -> RepositoryModel {
        RepositoryModel::default()
    }
}
