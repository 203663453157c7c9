//! Unchecked facades over the managers.
//!
//! Pure adapters: every operation delegates to the checked manager and
//! flattens its failure into the single opaque
//! [`UncheckedError`](crate::errors::UncheckedError).

use super::{ConsumerManager, KeyGenerator, ManagerParameters, VendorManager};
use crate::context::LicenseContext;
use crate::errors::UncheckedError;
use crate::io::{Sink, Source};
use crate::license::License;

/// Unchecked view of a [`VendorManager`].
pub struct UncheckedVendorManager<'a> {
    manager: &'a VendorManager,
}

impl<'a> UncheckedVendorManager<'a> {
    pub(crate) fn new(manager: &'a VendorManager) -> Self {
        Self { manager }
    }

    /// See [`VendorManager::generate_key_from`].
    pub fn generate_key_from(&self, bean: &License) -> Result<UncheckedKeyGenerator, UncheckedError> {
        Ok(UncheckedKeyGenerator {
            generator: self.manager.generate_key_from(bean)?,
        })
    }

    /// The wrapped checked manager.
    pub fn checked(&self) -> &VendorManager {
        self.manager
    }

    /// The context this manager was built from.
    pub fn context(&self) -> &LicenseContext {
        self.manager.context()
    }

    /// This manager's parameters.
    pub fn parameters(&self) -> &ManagerParameters {
        self.manager.parameters()
    }
}

/// Unchecked view of a [`KeyGenerator`].
pub struct UncheckedKeyGenerator {
    generator: KeyGenerator,
}

impl UncheckedKeyGenerator {
    /// See [`KeyGenerator::license`].
    pub fn license(&self) -> Result<License, UncheckedError> {
        Ok(self.generator.license()?)
    }

    /// See [`KeyGenerator::save_to`].
    pub fn save_to<S: Sink + ?Sized>(&self, sink: &S) -> Result<&Self, UncheckedError> {
        self.generator.save_to(sink)?;
        Ok(self)
    }

    /// The wrapped checked generator.
    pub fn checked(&self) -> &KeyGenerator {
        &self.generator
    }
}

/// Unchecked view of a [`ConsumerManager`].
pub struct UncheckedConsumerManager<'a> {
    manager: &'a ConsumerManager,
}

impl<'a> UncheckedConsumerManager<'a> {
    pub(crate) fn new(manager: &'a ConsumerManager) -> Self {
        Self { manager }
    }

    /// See [`ConsumerManager::install`].
    pub fn install<S: Source + ?Sized>(&self, source: &S) -> Result<(), UncheckedError> {
        Ok(self.manager.install(source)?)
    }

    /// See [`ConsumerManager::load`].
    pub fn load(&self) -> Result<License, UncheckedError> {
        Ok(self.manager.load()?)
    }

    /// See [`ConsumerManager::verify`].
    pub fn verify(&self) -> Result<(), UncheckedError> {
        Ok(self.manager.verify()?)
    }

    /// See [`ConsumerManager::uninstall`].
    pub fn uninstall(&self) -> Result<(), UncheckedError> {
        Ok(self.manager.uninstall()?)
    }

    /// The wrapped checked manager.
    pub fn checked(&self) -> &ConsumerManager {
        self.manager
    }

    /// The context this manager was built from.
    pub fn context(&self) -> &LicenseContext {
        self.manager.context()
    }

    /// This manager's parameters.
    pub fn parameters(&self) -> &ManagerParameters {
        self.manager.parameters()
    }
}
