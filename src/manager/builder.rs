//! Vendor and consumer manager builders.
//!
//! The builder DSL mirrors the shape of a deployment: a consumer builder
//! may open a `parent()` builder (closed with `up()`) to chain managers,
//! and both kinds open `authentication()` and `encryption()` sub-builders
//! that produce opaque values through the context's factories.

use super::{ConsumerManager, ManagerParameters, VendorManager};
use crate::auth::{Authentication, AuthenticationParameters};
use crate::context::LicenseContext;
use crate::crypto::encrypt::EncryptionParameters;
use crate::errors::KeywrightError;
use crate::io::{PathStore, Source, Store, Transformation};
use crate::passwd::{CheckedPasswordProtection, PasswordProtection};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Default)]
struct ManagerState {
    authentication: Option<Arc<dyn Authentication>>,
    encryption: Option<Arc<dyn Transformation>>,
    ftp_days: u32,
    parent: Option<Arc<ConsumerManager>>,
    store: Option<Arc<dyn Store>>,
}

impl ManagerState {
    fn into_parameters(self) -> Result<ManagerParameters, KeywrightError> {
        Ok(ManagerParameters {
            authentication: self
                .authentication
                .ok_or_else(|| KeywrightError::Config("authentication is not set".to_string()))?,
            encryption: self.encryption,
            ftp_days: self.ftp_days,
            parent: self.parent,
            store: self.store,
        })
    }
}

/// Common surface of the vendor, consumer, and parent builders.
///
/// The `set_*` methods are plumbing for the sub-builders; use the
/// `authentication()`/`encryption()` openers or the `with_*` setters.
pub trait ManagerBuilder: Sized {
    /// The context this builder was opened from.
    fn context(&self) -> &LicenseContext;

    #[doc(hidden)]
    fn set_authentication(self, authentication: Arc<dyn Authentication>) -> Self;

    #[doc(hidden)]
    fn set_encryption(self, encryption: Arc<dyn Transformation>) -> Self;

    /// Opens the authentication sub-builder; its `up()` returns here.
    fn authentication(self) -> AuthenticationBuilder<Self> {
        AuthenticationBuilder::new(self)
    }

    /// Sets a pre-built authentication.
    fn with_authentication(self, authentication: Arc<dyn Authentication>) -> Self {
        self.set_authentication(authentication)
    }

    /// Opens the encryption sub-builder; its `up()` returns here.
    fn encryption(self) -> EncryptionBuilder<Self> {
        EncryptionBuilder::new(self)
    }

    /// Sets a pre-built encryption transformation.
    fn with_encryption(self, encryption: Arc<dyn Transformation>) -> Self {
        self.set_encryption(encryption)
    }
}

/// Surface shared by builders that accept a parent manager.
pub trait ConsumerManagerBuilder: ManagerBuilder {
    #[doc(hidden)]
    fn set_parent(self, parent: Arc<ConsumerManager>) -> Self;

    /// Opens a builder for the parent consumer manager; its `up()` builds
    /// the parent, attaches it, and returns here.
    fn parent(self) -> ParentBuilder<Self> {
        ParentBuilder::new(self)
    }

    /// Attaches a pre-built parent manager.
    fn with_parent(self, parent: Arc<ConsumerManager>) -> Self {
        self.set_parent(parent)
    }
}

/// Builds a [`VendorManager`].
pub struct VendorBuilder {
    context: LicenseContext,
    state: ManagerState,
}

impl VendorBuilder {
    pub(crate) fn new(context: LicenseContext) -> Self {
        Self {
            context,
            state: ManagerState::default(),
        }
    }

    /// Builds the vendor manager. Authentication and encryption are
    /// required.
    pub fn build(self) -> Result<VendorManager, KeywrightError> {
        let parameters = self.state.into_parameters()?;
        if parameters.encryption.is_none() {
            return Err(KeywrightError::Config("encryption is not set".to_string()));
        }
        Ok(VendorManager::new(self.context, parameters))
    }
}

impl ManagerBuilder for VendorBuilder {
    fn context(&self) -> &LicenseContext {
        &self.context
    }

    fn set_authentication(mut self, authentication: Arc<dyn Authentication>) -> Self {
        self.state.authentication = Some(authentication);
        self
    }

    fn set_encryption(mut self, encryption: Arc<dyn Transformation>) -> Self {
        self.state.encryption = Some(encryption);
        self
    }
}

/// Builds a [`ConsumerManager`].
pub struct ConsumerBuilder {
    context: LicenseContext,
    state: ManagerState,
}

impl ConsumerBuilder {
    pub(crate) fn new(context: LicenseContext) -> Self {
        Self {
            context,
            state: ManagerState::default(),
        }
    }

    /// Sets the free-trial period in days (default: none).
    pub fn ftp_days(mut self, days: u32) -> Self {
        self.state.ftp_days = days;
        self
    }

    /// Sets the store holding the installed license key. Required.
    pub fn store_in(mut self, store: Arc<dyn Store>) -> Self {
        self.state.store = Some(store);
        self
    }

    /// Stores the license key at the given filesystem path.
    pub fn store_in_path(self, path: impl Into<PathBuf>) -> Self {
        self.store_in(Arc::new(PathStore::new(path)))
    }

    /// Stores the license key under the OS user data directory, in a
    /// directory named after the context subject.
    pub fn store_in_user_data(self, name: &str) -> Result<Self, KeywrightError> {
        let store = PathStore::in_user_data(self.context.subject(), name)?;
        Ok(self.store_in(Arc::new(store)))
    }

    /// Builds the consumer manager. Authentication and a store are
    /// required; encryption may be inherited from a parent.
    pub fn build(self) -> Result<ConsumerManager, KeywrightError> {
        ConsumerManager::from_state(self.context, self.state.into_parameters()?)
    }
}

impl ManagerBuilder for ConsumerBuilder {
    fn context(&self) -> &LicenseContext {
        &self.context
    }

    fn set_authentication(mut self, authentication: Arc<dyn Authentication>) -> Self {
        self.state.authentication = Some(authentication);
        self
    }

    fn set_encryption(mut self, encryption: Arc<dyn Transformation>) -> Self {
        self.state.encryption = Some(encryption);
        self
    }
}

impl ConsumerManagerBuilder for ConsumerBuilder {
    fn set_parent(mut self, parent: Arc<ConsumerManager>) -> Self {
        self.state.parent = Some(parent);
        self
    }
}

/// Builds a parent [`ConsumerManager`] inside another consumer builder.
pub struct ParentBuilder<B> {
    outer: B,
    context: LicenseContext,
    state: ManagerState,
}

impl<B: ConsumerManagerBuilder> ParentBuilder<B> {
    pub(crate) fn new(outer: B) -> Self {
        let context = outer.context().clone();
        Self {
            outer,
            context,
            state: ManagerState::default(),
        }
    }

    /// Sets the parent's free-trial period in days (default: none).
    pub fn ftp_days(mut self, days: u32) -> Self {
        self.state.ftp_days = days;
        self
    }

    /// Sets the parent's store. Required.
    pub fn store_in(mut self, store: Arc<dyn Store>) -> Self {
        self.state.store = Some(store);
        self
    }

    /// Stores the parent's license key at the given filesystem path.
    pub fn store_in_path(self, path: impl Into<PathBuf>) -> Self {
        self.store_in(Arc::new(PathStore::new(path)))
    }

    /// Stores the parent's license key under the OS user data directory.
    pub fn store_in_user_data(self, name: &str) -> Result<Self, KeywrightError> {
        let store = PathStore::in_user_data(self.context.subject(), name)?;
        Ok(self.store_in(Arc::new(store)))
    }

    /// Builds the parent manager, attaches it to the outer builder, and
    /// returns the outer builder.
    pub fn up(self) -> Result<B, KeywrightError> {
        let manager = ConsumerManager::from_state(self.context, self.state.into_parameters()?)?;
        Ok(self.outer.set_parent(Arc::new(manager)))
    }
}

impl<B: ConsumerManagerBuilder> ManagerBuilder for ParentBuilder<B> {
    fn context(&self) -> &LicenseContext {
        &self.context
    }

    fn set_authentication(mut self, authentication: Arc<dyn Authentication>) -> Self {
        self.state.authentication = Some(authentication);
        self
    }

    fn set_encryption(mut self, encryption: Arc<dyn Transformation>) -> Self {
        self.state.encryption = Some(encryption);
        self
    }
}

impl<B: ConsumerManagerBuilder> ConsumerManagerBuilder for ParentBuilder<B> {
    fn set_parent(mut self, parent: Arc<ConsumerManager>) -> Self {
        self.state.parent = Some(parent);
        self
    }
}

/// Builds an [`Authentication`] through the context's authentication
/// factory.
pub struct AuthenticationBuilder<B: ManagerBuilder> {
    outer: B,
    alias: Option<String>,
    algorithm: Option<String>,
    key_protection: Option<Arc<dyn PasswordProtection>>,
    store_protection: Option<Arc<dyn PasswordProtection>>,
    store_type: Option<String>,
    source: Option<Arc<dyn Source>>,
}

impl<B: ManagerBuilder> AuthenticationBuilder<B> {
    fn new(outer: B) -> Self {
        Self {
            outer,
            alias: None,
            algorithm: None,
            key_protection: None,
            store_protection: None,
            store_type: None,
            source: None,
        }
    }

    /// Sets the keystore entry alias. Required.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Sets the signature algorithm (default: the backend's).
    pub fn algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }

    /// Protects the signing key password (default: the store protection).
    pub fn key_protection(mut self, protection: Arc<dyn PasswordProtection>) -> Self {
        self.key_protection = Some(protection);
        self
    }

    /// Protects the keystore password.
    pub fn store_protection(mut self, protection: Arc<dyn PasswordProtection>) -> Self {
        self.store_protection = Some(protection);
        self
    }

    /// Sets the keystore type (default: the context's keystore type).
    pub fn store_type(mut self, store_type: impl Into<String>) -> Self {
        self.store_type = Some(store_type.into());
        self
    }

    /// Reads the keystore from the given source.
    pub fn load_from(mut self, source: Arc<dyn Source>) -> Self {
        self.source = Some(source);
        self
    }

    /// Reads the keystore from the given filesystem path.
    pub fn load_from_path(self, path: impl Into<PathBuf>) -> Self {
        self.load_from(Arc::new(PathStore::new(path)))
    }

    /// Builds the authentication through the context's factory, attaches
    /// it, and returns the outer builder.
    pub fn up(self) -> Result<B, KeywrightError> {
        let context = self.outer.context().clone();
        let alias = self
            .alias
            .ok_or_else(|| KeywrightError::Config("keystore alias is not set".to_string()))?;
        let policy = context.password_policy().clone();
        let key_protection = self.key_protection.map(|protection| {
            Arc::new(CheckedPasswordProtection::new(protection, policy.clone()))
                as Arc<dyn PasswordProtection>
        });
        let store_protection = self.store_protection.map(|protection| {
            Arc::new(CheckedPasswordProtection::new(protection, policy.clone()))
                as Arc<dyn PasswordProtection>
        });
        let parameters = AuthenticationParameters {
            alias,
            algorithm: self.algorithm,
            key_protection,
            store_protection,
            store_type: self
                .store_type
                .unwrap_or_else(|| context.keystore_type().to_string()),
            source: self.source,
        };
        let authentication = context.authentication_factory().authentication(parameters)?;
        Ok(self.outer.set_authentication(authentication))
    }
}

/// Builds an encryption [`Transformation`] through the context's
/// encryption factory.
pub struct EncryptionBuilder<B: ManagerBuilder> {
    outer: B,
    algorithm: Option<String>,
    protection: Option<Arc<dyn PasswordProtection>>,
}

impl<B: ManagerBuilder> EncryptionBuilder<B> {
    fn new(outer: B) -> Self {
        Self {
            outer,
            algorithm: None,
            protection: None,
        }
    }

    /// Sets the encryption algorithm (default: the context's).
    pub fn algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }

    /// Protects the encryption password. Required.
    pub fn protection(mut self, protection: Arc<dyn PasswordProtection>) -> Self {
        self.protection = Some(protection);
        self
    }

    /// Builds the transformation through the context's factory, attaches
    /// it, and returns the outer builder.
    pub fn up(self) -> Result<B, KeywrightError> {
        let context = self.outer.context().clone();
        let protection = self.protection.ok_or_else(|| {
            KeywrightError::Config("encryption password protection is not set".to_string())
        })?;
        let parameters = EncryptionParameters {
            algorithm: self
                .algorithm
                .unwrap_or_else(|| context.encryption_algorithm().to_string()),
            protection: Arc::new(CheckedPasswordProtection::new(
                protection,
                context.password_policy().clone(),
            )),
        };
        let encryption = context.encryption_factory().transformation(parameters)?;
        Ok(self.outer.set_encryption(encryption))
    }
}
