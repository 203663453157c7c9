//! Authentication contract: signing and verifying repository models.

use crate::errors::KeywrightError;
use crate::io::Source;
use crate::license::License;
use crate::passwd::PasswordProtection;
use crate::repository::{Decoder, RepositoryController};
use std::sync::Arc;

/// Signs license beans into repository models and verifies them back out.
///
/// Both operations yield a [`Decoder`] over the (signed or verified)
/// artifact bytes.
pub trait Authentication: Send + Sync {
    /// Encodes and signs `license` into the controller's model.
    fn sign(
        &self,
        controller: &mut RepositoryController,
        license: &License,
    ) -> Result<Decoder, KeywrightError>;

    /// Verifies the controller's model and yields the verified artifact.
    fn verify(&self, controller: &RepositoryController) -> Result<Decoder, KeywrightError>;
}

/// Parameters for building an [`Authentication`].
///
/// Built by the manager builders' authentication sub-builder; password
/// protections arrive already wrapped with the context's password policy.
pub struct AuthenticationParameters {
    /// Alias of the keystore entry to use.
    pub alias: String,

    /// Signature algorithm override; the backend's default applies when
    /// absent.
    pub algorithm: Option<String>,

    /// Protection for the signing key password. Falls back to the store
    /// protection when absent.
    pub key_protection: Option<Arc<dyn PasswordProtection>>,

    /// Protection for the keystore password.
    pub store_protection: Option<Arc<dyn PasswordProtection>>,

    /// Keystore type; defaults to the context's keystore type.
    pub store_type: String,

    /// Where to read the keystore from.
    pub source: Option<Arc<dyn Source>>,
}

impl AuthenticationParameters {
    /// The protection guarding the signing key: the key protection if
    /// configured, otherwise the store protection.
    pub fn key_protection(&self) -> Result<Arc<dyn PasswordProtection>, KeywrightError> {
        self.key_protection
            .clone()
            .or_else(|| self.store_protection.clone())
            .ok_or_else(|| {
                KeywrightError::Authentication(
                    "no password protection configured for the signing key".to_string(),
                )
            })
    }
}

/// Builds [`Authentication`] values from parameters.
pub trait AuthenticationFactory: Send + Sync {
    /// Builds the authentication for the given parameters.
    fn authentication(
        &self,
        parameters: AuthenticationParameters,
    ) -> Result<Arc<dyn Authentication>, KeywrightError>;
}

/// The standard factory, producing a keystore-backed Ed25519
/// [`Notary`](crate::crypto::notary::Notary).
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardAuthenticationFactory;

impl AuthenticationFactory for StandardAuthenticationFactory {
    fn authentication(
        &self,
        parameters: AuthenticationParameters,
    ) -> Result<Arc<dyn Authentication>, KeywrightError> {
        Ok(Arc::new(crate::crypto::notary::Notary::new(parameters)))
    }
}
