//! The consumer-side license manager.

use super::cache::CacheCell;
use super::{KeyGenerator, ManagerParameters, Pipeline, UncheckedConsumerManager};
use crate::context::LicenseContext;
use crate::errors::KeywrightError;
use crate::io::{MemoryStore, Source, Store};
use crate::license::License;
use crate::repository::Decoder;
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex, PoisonError};

/// Installs, loads, verifies, and uninstalls license keys on the consumer
/// side.
///
/// Authentication results are cached per source with the context's cache
/// period. When a parent manager is attached, every operation tries the
/// parent first; `load` and `verify` additionally fall back to generating a
/// free-trial key when this manager can sign, its store is empty, and a
/// free-trial period is configured.
pub struct ConsumerManager {
    context: LicenseContext,
    parameters: ManagerParameters,
    store: Arc<dyn Store>,
    cached_decoder: CacheCell<Decoder>,
    cached_license: CacheCell<License>,
    store_lock: Mutex<()>,
    can_generate: OnceCell<bool>,
}

impl ConsumerManager {
    pub(crate) fn from_state(
        context: LicenseContext,
        parameters: ManagerParameters,
    ) -> Result<Self, KeywrightError> {
        let store = parameters
            .store
            .clone()
            .ok_or_else(|| KeywrightError::Config("store is not set".to_string()))?;
        if parameters.encryption.is_none() && parameters.parent.is_none() {
            return Err(KeywrightError::Config(
                "encryption is not set and there is no parent to inherit it from".to_string(),
            ));
        }
        Ok(Self {
            context,
            parameters,
            store,
            cached_decoder: CacheCell::new(),
            cached_license: CacheCell::new(),
            store_lock: Mutex::new(()),
            can_generate: OnceCell::new(),
        })
    }

    /// Verifies `source` holds an authentic license key, then copies it
    /// into the store.
    pub fn install<S: Source + ?Sized>(&self, source: &S) -> Result<(), KeywrightError> {
        match self.parameters.parent() {
            None => self.caching_install(source),
            Some(parent) => match parent.install(source) {
                Ok(()) => Ok(()),
                Err(first) => {
                    if self.can_generate_license_keys() {
                        Err(first)
                    } else {
                        self.caching_install(source)
                    }
                }
            },
        }
    }

    /// Loads and authenticates the installed license. Does not check the
    /// validity window.
    pub fn load(&self) -> Result<License, KeywrightError> {
        match self.parameters.parent() {
            None => self.caching_load(),
            Some(parent) => {
                let first = match parent.load() {
                    Ok(license) => return Ok(license),
                    Err(first) => first,
                };
                if let Ok(license) = self.caching_load() {
                    return Ok(license);
                }
                let _guard = self.store_lock.lock().unwrap_or_else(PoisonError::into_inner);
                match self.caching_load() {
                    Ok(license) => Ok(license),
                    Err(_) => self.generate_iff_new_ftp(first)?.license(),
                }
            }
        }
    }

    /// Loads the installed license and validates it.
    pub fn verify(&self) -> Result<(), KeywrightError> {
        match self.parameters.parent() {
            None => self.caching_verify(),
            Some(parent) => {
                let first = match parent.verify() {
                    Ok(()) => return Ok(()),
                    Err(first) => first,
                };
                if self.caching_verify().is_ok() {
                    return Ok(());
                }
                let _guard = self.store_lock.lock().unwrap_or_else(PoisonError::into_inner);
                match self.caching_verify() {
                    Ok(()) => Ok(()),
                    Err(_) => {
                        self.generate_iff_new_ftp(first)?;
                        Ok(())
                    }
                }
            }
        }
    }

    /// Authenticates the installed license key, then deletes the store.
    pub fn uninstall(&self) -> Result<(), KeywrightError> {
        match self.parameters.parent() {
            None => self.caching_uninstall(),
            Some(parent) => match parent.uninstall() {
                Ok(()) => Ok(()),
                Err(first) => {
                    if self.can_generate_license_keys() {
                        Err(first)
                    } else {
                        self.caching_uninstall()
                    }
                }
            },
        }
    }

    /// The context this manager was built from.
    pub fn context(&self) -> &LicenseContext {
        &self.context
    }

    /// This manager's parameters.
    pub fn parameters(&self) -> &ManagerParameters {
        &self.parameters
    }

    /// A view of this manager whose operations return the flattened
    /// [`UncheckedError`](crate::errors::UncheckedError).
    pub fn unchecked(&self) -> UncheckedConsumerManager<'_> {
        UncheckedConsumerManager::new(self)
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.context.clone(), self.parameters.clone())
    }

    fn caching_install<S: Source + ?Sized>(&self, source: &S) -> Result<(), KeywrightError> {
        let _guard = self.store_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.context.authorization().clear_install(&self.context)?;
        // Checks the digital signature before anything is persisted.
        self.decode_license_cached(source)?;
        self.store.write(&source.read()?)?;
        // Re-key the entries populated from the source to the store, so
        // subsequent loads (which read the store) hit them.
        self.cached_decoder.rekey(self.store.token());
        self.cached_license.rekey(self.store.token());
        Ok(())
    }

    fn caching_load(&self) -> Result<License, KeywrightError> {
        self.context.authorization().clear_load(&self.context)?;
        self.decode_license_cached(self.store.as_ref())
    }

    fn caching_verify(&self) -> Result<(), KeywrightError> {
        self.context.authorization().clear_verify(&self.context)?;
        self.validate_cached(self.store.as_ref())
    }

    fn caching_uninstall(&self) -> Result<(), KeywrightError> {
        let _guard = self.store_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.context
            .authorization()
            .clear_uninstall(&self.context)?;
        // Authenticate the installed key before deleting it.
        self.authenticate_cached(self.store.as_ref())?;
        self.store.delete()?;
        self.cached_decoder.clear();
        self.cached_license.clear();
        Ok(())
    }

    /// Latched capability probe: can this manager sign license keys?
    ///
    /// Resolved once by test-generating a key into a scratch store. A
    /// consumer-only keystore fails the probe, and the chain then preserves
    /// parent errors instead of attempting free-trial generation.
    fn can_generate_license_keys(&self) -> bool {
        *self.can_generate.get_or_init(|| {
            self.pipeline()
                .generate_key_from(&self.context.license())
                .and_then(|generator| {
                    generator.save_to(&MemoryStore::new())?;
                    Ok(())
                })
                .is_ok()
        })
    }

    /// Generates and installs a free-trial key, unless this manager cannot
    /// sign or a key is already installed; in both cases `error` is
    /// rethrown. Callers must hold the store lock.
    fn generate_iff_new_ftp(&self, error: KeywrightError) -> Result<KeyGenerator, KeywrightError> {
        if !self.can_generate_license_keys() {
            return Err(error);
        }
        // Never overwrite an installed key with a free trial.
        if self.store.exists()? {
            return Err(error);
        }
        let generator = self.pipeline().generate_key_from(&self.context.license())?;
        generator.save_to(self.store.as_ref())?;
        Ok(generator)
    }

    fn deadline(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.context.cache_period())
            .ok()
            .and_then(|period| now.checked_add_signed(period))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn authenticate_cached<S: Source + ?Sized>(&self, source: &S) -> Result<Decoder, KeywrightError> {
        let token = source.token();
        let now = self.context.now_utc();
        if let Some(decoder) = self.cached_decoder.lookup(&token, now) {
            return Ok(decoder);
        }
        let decoder = self.pipeline().authenticate(source)?;
        self.cached_decoder
            .insert(token, decoder.clone(), self.deadline(now));
        Ok(decoder)
    }

    fn decode_license_cached<S: Source + ?Sized>(&self, source: &S) -> Result<License, KeywrightError> {
        self.authenticate_cached(source)?.license()
    }

    fn validate_cached<S: Source + ?Sized>(&self, source: &S) -> Result<(), KeywrightError> {
        let token = source.token();
        let now = self.context.now_utc();
        let license = match self.cached_license.lookup(&token, now) {
            Some(license) => license,
            None => {
                let license = self.decode_license_cached(source)?;
                self.cached_license
                    .insert(token, license.clone(), self.deadline(now));
                license
            }
        };
        self.context.validation().validate(&license)
    }
}
