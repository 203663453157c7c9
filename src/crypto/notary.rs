//! Ed25519 notary: the standard keystore-backed authentication.

use crate::auth::{Authentication, AuthenticationParameters};
use crate::crypto::keystore::{self, Keystore, ED25519};
use crate::errors::KeywrightError;
use crate::license::License;
use crate::passwd::PasswordUsage;
use crate::repository::{Decoder, RepositoryController};
use ed25519_dalek::{Signature, Signer, Verifier};

/// Signs and verifies repository models with Ed25519 keys from a JSON
/// keystore.
///
/// Signing unseals the entry's signing seed with the key password at write
/// usage, so the password policy runs exactly then. Verification needs only
/// the entry's public verifying key.
pub struct Notary {
    parameters: AuthenticationParameters,
}

impl Notary {
    /// A notary over the given parameters.
    pub fn new(parameters: AuthenticationParameters) -> Self {
        Self { parameters }
    }

    fn algorithm(&self) -> &str {
        self.parameters.algorithm.as_deref().unwrap_or(ED25519)
    }

    fn keystore(&self) -> Result<Keystore, KeywrightError> {
        let source = self.parameters.source.as_ref().ok_or_else(|| {
            KeywrightError::Authentication("no keystore source configured".to_string())
        })?;
        Keystore::load(&source.read()?, &self.parameters.store_type)
    }

    fn check_entry_algorithm(&self, entry_algorithm: &str) -> Result<(), KeywrightError> {
        if !entry_algorithm.eq_ignore_ascii_case(self.algorithm()) {
            return Err(KeywrightError::Authentication(format!(
                "keystore entry algorithm {:?} does not match requested {:?}",
                entry_algorithm,
                self.algorithm()
            )));
        }
        Ok(())
    }
}

impl Authentication for Notary {
    fn sign(
        &self,
        controller: &mut RepositoryController,
        license: &License,
    ) -> Result<Decoder, KeywrightError> {
        let keystore = self.keystore()?;
        let entry = keystore.entry(&self.parameters.alias)?;
        self.check_entry_algorithm(&entry.algorithm)?;

        // Write usage: the password policy gates key generation here.
        let password = self
            .parameters
            .key_protection()?
            .password(PasswordUsage::Write)?;
        let signing_key = keystore::unseal_signing_key(entry, &password)?;

        controller.sign_with(self.algorithm(), license, |artifact| {
            Ok(signing_key.sign(artifact).to_bytes().to_vec())
        })
    }

    fn verify(&self, controller: &RepositoryController) -> Result<Decoder, KeywrightError> {
        let keystore = self.keystore()?;
        let entry = keystore.entry(&self.parameters.alias)?;
        self.check_entry_algorithm(&entry.algorithm)?;
        let verifying_key = keystore::decode_verifying_key(&entry.verifying_key)?;

        controller.verify_with(self.algorithm(), |artifact, signature| {
            let signature: [u8; 64] = signature.try_into().map_err(|_| {
                KeywrightError::Authentication("signature must be 64 bytes".to_string())
            })?;
            verifying_key
                .verify(artifact, &Signature::from_bytes(&signature))
                .map_err(|_| {
                    KeywrightError::Authentication("signature verification failed".to_string())
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Codec, JsonCodec};
    use crate::io::{MemoryStore, Sink, Source};
    use crate::passwd::{Password, StaticPasswordProtection};
    use crate::repository::{RepositoryContext, RepositoryModel, StandardRepositoryContext};
    use std::sync::Arc;

    const STORE_PW: &str = "store-pw-1";

    fn keystore_source(verify_only: bool) -> Arc<dyn Source> {
        let mut keystore = Keystore::new();
        keystore
            .generate_entry("signer", &Password::new(STORE_PW.as_bytes().to_vec()))
            .unwrap();
        if verify_only {
            keystore = keystore.verify_only();
        }
        let store = MemoryStore::new();
        store.write(&keystore.save().unwrap()).unwrap();
        Arc::new(store)
    }

    fn notary(source: Arc<dyn Source>) -> Notary {
        Notary::new(AuthenticationParameters {
            alias: "signer".to_string(),
            algorithm: None,
            key_protection: None,
            store_protection: Some(Arc::new(StaticPasswordProtection::new(STORE_PW))),
            store_type: "json".to_string(),
            source: Some(source),
        })
    }

    fn codec() -> Arc<dyn Codec> {
        Arc::new(JsonCodec)
    }

    #[test]
    fn sign_then_verify() {
        let source = keystore_source(false);
        let notary = notary(source);

        let mut license = License::default();
        license.holder = Some("CN=Alice".to_string());

        let mut controller =
            StandardRepositoryContext.controller(RepositoryModel::default(), codec());
        let decoder = notary.sign(&mut controller, &license).unwrap();
        assert_eq!(decoder.license().unwrap(), license);

        let controller = StandardRepositoryContext.controller(controller.into_model(), codec());
        let decoder = notary.verify(&controller).unwrap();
        assert_eq!(decoder.license().unwrap(), license);
    }

    #[test]
    fn tampered_artifact_fails_verification() {
        let source = keystore_source(false);
        let notary = notary(source);

        let mut controller =
            StandardRepositoryContext.controller(RepositoryModel::default(), codec());
        notary.sign(&mut controller, &License::default()).unwrap();
        let mut model = controller.into_model();

        let mut forged = License::default();
        forged.consumer_amount = 1000;
        model.artifact = {
            use base64::{engine::general_purpose::STANDARD, Engine as _};
            STANDARD.encode(JsonCodec.encode_license(&forged).unwrap())
        };

        let controller = StandardRepositoryContext.controller(model, codec());
        assert!(matches!(
            notary.verify(&controller),
            Err(KeywrightError::Authentication(_))
        ));
    }

    #[test]
    fn verify_only_keystore_cannot_sign() {
        let source = keystore_source(true);
        let notary = notary(source);

        let mut controller =
            StandardRepositoryContext.controller(RepositoryModel::default(), codec());
        assert!(matches!(
            notary.sign(&mut controller, &License::default()),
            Err(KeywrightError::Authentication(_))
        ));
    }

    #[test]
    fn verify_only_keystore_still_verifies() {
        let full = {
            let mut keystore = Keystore::new();
            keystore
                .generate_entry("signer", &Password::new(STORE_PW.as_bytes().to_vec()))
                .unwrap();
            keystore
        };
        let signer_store = MemoryStore::new();
        signer_store.write(&full.save().unwrap()).unwrap();
        let verifier_store = MemoryStore::new();
        verifier_store
            .write(&full.verify_only().save().unwrap())
            .unwrap();

        let signer = notary(Arc::new(signer_store));
        let verifier = notary(Arc::new(verifier_store));

        let mut controller =
            StandardRepositoryContext.controller(RepositoryModel::default(), codec());
        signer.sign(&mut controller, &License::default()).unwrap();

        let controller = StandardRepositoryContext.controller(controller.into_model(), codec());
        assert!(verifier.verify(&controller).is_ok());
    }

    #[test]
    fn missing_keystore_source_fails() {
        let notary = Notary::new(AuthenticationParameters {
            alias: "signer".to_string(),
            algorithm: None,
            key_protection: None,
            store_protection: Some(Arc::new(StaticPasswordProtection::new(STORE_PW))),
            store_type: "json".to_string(),
            source: None,
        });
        let controller =
            StandardRepositoryContext.controller(RepositoryModel::default(), codec());
        assert!(matches!(
            notary.verify(&controller),
            Err(KeywrightError::Authentication(_))
        ));
    }
}
