//! License managers: the vendor and consumer operation surface.
//!
//! A vendor manager generates license keys; a consumer manager installs,
//! loads, verifies, and uninstalls them, caching authentication results and
//! optionally chaining to a parent manager with free-trial fallback. Both
//! run the same pipeline: codec encode, compress, encrypt on the way out;
//! decrypt, decompress, codec decode, verify on the way in.

mod builder;
mod cache;
mod consumer;
mod generator;
mod unchecked;
mod vendor;

pub use builder::{
    AuthenticationBuilder, ConsumerBuilder, ConsumerManagerBuilder, EncryptionBuilder,
    ManagerBuilder, ParentBuilder, VendorBuilder,
};
pub use consumer::ConsumerManager;
pub use generator::KeyGenerator;
pub use unchecked::{UncheckedConsumerManager, UncheckedKeyGenerator, UncheckedVendorManager};
pub use vendor::VendorManager;

use crate::auth::Authentication;
use crate::context::LicenseContext;
use crate::errors::KeywrightError;
use crate::init::LicenseInitialization;
use crate::io::{ChainedTransformation, Source, Store, Transformation};
use crate::license::License;
use crate::repository::Decoder;
use std::sync::Arc;

/// Per-manager configuration bundle.
///
/// Shared by a manager and the key generators it spawns.
#[derive(Clone)]
pub struct ManagerParameters {
    pub(crate) authentication: Arc<dyn Authentication>,
    pub(crate) encryption: Option<Arc<dyn Transformation>>,
    pub(crate) ftp_days: u32,
    pub(crate) parent: Option<Arc<ConsumerManager>>,
    pub(crate) store: Option<Arc<dyn Store>>,
}

impl ManagerParameters {
    /// The manager's authentication.
    pub fn authentication(&self) -> &Arc<dyn Authentication> {
        &self.authentication
    }

    /// The effective encryption transformation: the manager's own, or the
    /// nearest ancestor's when inherited through the chain.
    pub fn encryption(&self) -> Result<Arc<dyn Transformation>, KeywrightError> {
        if let Some(encryption) = &self.encryption {
            return Ok(encryption.clone());
        }
        match &self.parent {
            Some(parent) => parent.parameters().encryption(),
            None => Err(KeywrightError::Config(
                "encryption is not set and there is no parent to inherit it from".to_string(),
            )),
        }
    }

    /// Length of the free-trial period in days; zero disables it.
    pub fn ftp_days(&self) -> u32 {
        self.ftp_days
    }

    /// The parent consumer manager, if chained.
    pub fn parent(&self) -> Option<&Arc<ConsumerManager>> {
        self.parent.as_ref()
    }

    /// The store holding the installed license key, if any.
    pub fn store(&self) -> Option<&Arc<dyn Store>> {
        self.store.as_ref()
    }
}

/// The shared generate/authenticate pipeline behind both manager kinds.
#[derive(Clone)]
pub(crate) struct Pipeline {
    pub(crate) context: LicenseContext,
    pub(crate) parameters: ManagerParameters,
}

impl Pipeline {
    pub(crate) fn new(context: LicenseContext, parameters: ManagerParameters) -> Self {
        Self {
            context,
            parameters,
        }
    }

    /// The effective initialization, with the free-trial window appended
    /// when this manager carries one.
    pub(crate) fn initialization(&self) -> Arc<dyn LicenseInitialization> {
        let initialization = self.context.initialization();
        if self.parameters.ftp_days != 0 {
            Arc::new(FtpInitialization {
                inner: initialization,
                ftp_days: self.parameters.ftp_days,
            })
        } else {
            initialization
        }
    }

    /// Compression composed with encryption, in write order.
    pub(crate) fn transformation(&self) -> Result<ChainedTransformation, KeywrightError> {
        Ok(ChainedTransformation::new(
            self.context.compression().clone(),
            self.parameters.encryption()?,
        ))
    }

    /// Clears the generate gate and returns a lazy key generator over a
    /// private copy of `bean`.
    pub(crate) fn generate_key_from(&self, bean: &License) -> Result<KeyGenerator, KeywrightError> {
        self.context.authorization().clear_generate(&self.context)?;
        Ok(KeyGenerator::new(self.clone(), bean.clone()))
    }

    /// Reads, decrypts, decompresses, decodes, and verifies a license key.
    pub(crate) fn authenticate<S: Source + ?Sized>(
        &self,
        source: &S,
    ) -> Result<Decoder, KeywrightError> {
        let wire = source.read()?;
        let encoded = self.transformation()?.unapply(&wire)?;
        let model = self.context.codec().decode_repository(&encoded)?;
        let controller = self
            .context
            .repository_context()
            .controller(model, self.context.codec().clone());
        self.parameters.authentication.verify(&controller)
    }

    /// Authenticates a license key and decodes its bean.
    pub(crate) fn decode_license<S: Source + ?Sized>(
        &self,
        source: &S,
    ) -> Result<License, KeywrightError> {
        self.authenticate(source)?.license()
    }
}

/// Appends the free-trial validity window after the regular initialization:
/// the countdown starts when the key is generated, not when the program was
/// installed.
struct FtpInitialization {
    inner: Arc<dyn LicenseInitialization>,
    ftp_days: u32,
}

impl LicenseInitialization for FtpInitialization {
    fn initialize(&self, bean: &mut License) {
        self.inner.initialize(bean);
        if let Some(issued) = bean.issued {
            bean.not_before = Some(issued);
            bean.not_after = Some(issued + chrono::Duration::days(i64::from(self.ftp_days)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::testing::context_at;

    const NOW: &str = "2026-03-01T12:00:00Z";

    #[test]
    fn ftp_initialization_anchors_the_window_to_the_issue_date() {
        let context = context_at("App", NOW);
        let ftp = FtpInitialization {
            inner: context.initialization(),
            ftp_days: 7,
        };
        let mut bean = License::default();
        ftp.initialize(&mut bean);

        let issued = bean.issued.expect("issued is set");
        assert_eq!(issued, context.now_utc());
        assert_eq!(bean.not_before, Some(issued));
        assert_eq!(bean.not_after, Some(issued + chrono::Duration::days(7)));
    }

    #[test]
    fn ftp_initialization_respects_a_preset_issue_date() {
        let context = context_at("App", NOW);
        let ftp = FtpInitialization {
            inner: context.initialization(),
            ftp_days: 30,
        };
        let issued = context.now_utc() - chrono::Duration::days(3);
        let mut bean = License::default();
        bean.issued = Some(issued);
        ftp.initialize(&mut bean);

        assert_eq!(bean.issued, Some(issued));
        assert_eq!(bean.not_before, Some(issued));
        assert_eq!(bean.not_after, Some(issued + chrono::Duration::days(30)));
    }
}
