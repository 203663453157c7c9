//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use keywright::auth::{Authentication, AuthenticationParameters};
use keywright::codec::JsonCodec;
use keywright::context::{Clock, ContextBuilder, LicenseContext};
use keywright::crypto::compress::DeflateCompression;
use keywright::crypto::encrypt::{EncryptionParameters, StandardEncryptionFactory, CHACHA20_POLY1305};
use keywright::crypto::keystore::{Keystore, JSON_KEYSTORE_TYPE};
use keywright::errors::KeywrightError;
use keywright::io::{MemoryStore, Sink, Source, SourceToken, Store, Transformation};
use keywright::license::{License, StandardLicenseFactory};
use keywright::manager::{ConsumerManager, ManagerBuilder as _, VendorManager};
use keywright::passwd::{Password, PasswordProtection, StaticPasswordProtection};
use keywright::repository::{Decoder, RepositoryController, StandardRepositoryContext};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const ALIAS: &str = "app-signer";
pub const STORE_PW: &str = "store-pw-123";
pub const SEAL_PW: &str = "seal-pw-123";
pub const T0: &str = "2026-03-01T12:00:00Z";

/// A settable clock shared between contexts and the test body.
pub struct SharedClock {
    now: Mutex<DateTime<Utc>>,
}

impl SharedClock {
    pub fn at(rfc3339: &str) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(
                DateTime::parse_from_rfc3339(rfc3339)
                    .expect("valid RFC 3339")
                    .with_timezone(&Utc),
            ),
        })
    }

    pub fn advance(&self, duration: chrono::Duration) {
        *self.now.lock().unwrap() += duration;
    }

    pub fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

impl Clock for SharedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.now()
    }
}

/// A keystore with a signing and verifying key under [`ALIAS`].
pub fn full_keystore() -> Keystore {
    let mut keystore = Keystore::new();
    keystore
        .generate_entry(ALIAS, &Password::new(STORE_PW.as_bytes().to_vec()))
        .unwrap();
    keystore
}

/// Serializes a keystore into an in-memory source.
pub fn source_for(keystore: &Keystore) -> Arc<dyn Source> {
    let store = MemoryStore::new();
    store.write(&keystore.save().unwrap()).unwrap();
    Arc::new(store)
}

pub fn protection(secret: &str) -> Arc<dyn PasswordProtection> {
    Arc::new(StaticPasswordProtection::new(secret))
}

/// A fully wired context builder for `subject`, left open for tweaks.
pub fn context_builder(subject: &str, clock: Arc<dyn Clock>) -> ContextBuilder {
    LicenseContext::builder()
        .subject(subject)
        .codec(Arc::new(JsonCodec))
        .compression(Arc::new(DeflateCompression::default()))
        .encryption_algorithm(CHACHA20_POLY1305)
        .encryption_factory(Arc::new(StandardEncryptionFactory))
        .license_factory(Arc::new(StandardLicenseFactory))
        .repository_context(Arc::new(StandardRepositoryContext))
        .keystore_type(JSON_KEYSTORE_TYPE)
        .clock(clock)
}

pub fn context(subject: &str, clock: Arc<dyn Clock>) -> LicenseContext {
    context_builder(subject, clock).build().unwrap()
}

/// A vendor manager over the given keystore.
pub fn vendor(context: &LicenseContext, keystore: Arc<dyn Source>) -> VendorManager {
    context
        .vendor()
        .authentication()
        .alias(ALIAS)
        .store_protection(protection(STORE_PW))
        .load_from(keystore)
        .up()
        .unwrap()
        .encryption()
        .protection(protection(SEAL_PW))
        .up()
        .unwrap()
        .build()
        .unwrap()
}

/// A consumer manager over the given keystore and store.
pub fn consumer(
    context: &LicenseContext,
    keystore: Arc<dyn Source>,
    store: Arc<dyn Store>,
) -> ConsumerManager {
    context
        .consumer()
        .authentication()
        .alias(ALIAS)
        .store_protection(protection(STORE_PW))
        .load_from(keystore)
        .up()
        .unwrap()
        .encryption()
        .protection(protection(SEAL_PW))
        .up()
        .unwrap()
        .store_in(store)
        .build()
        .unwrap()
}

/// Builds the standard notary directly, bypassing the builder DSL, so
/// tests can wrap it in counting decorators.
pub fn notary(context: &LicenseContext, keystore: Arc<dyn Source>) -> Arc<dyn Authentication> {
    context
        .authentication_factory()
        .authentication(AuthenticationParameters {
            alias: ALIAS.to_string(),
            algorithm: None,
            key_protection: None,
            store_protection: Some(protection(STORE_PW)),
            store_type: context.keystore_type().to_string(),
            source: Some(keystore),
        })
        .unwrap()
}

/// Builds the standard password-based encryption directly.
pub fn encryption(context: &LicenseContext, secret: &str) -> Arc<dyn Transformation> {
    context
        .encryption_factory()
        .transformation(EncryptionParameters {
            algorithm: CHACHA20_POLY1305.to_string(),
            protection: protection(secret),
        })
        .unwrap()
}

/// Counts sign and verify calls on its way through to the wrapped
/// authentication.
pub struct CountingAuthentication {
    inner: Arc<dyn Authentication>,
    signs: AtomicUsize,
    verifies: AtomicUsize,
}

impl CountingAuthentication {
    pub fn wrap(inner: Arc<dyn Authentication>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            signs: AtomicUsize::new(0),
            verifies: AtomicUsize::new(0),
        })
    }

    pub fn sign_count(&self) -> usize {
        self.signs.load(Ordering::SeqCst)
    }

    pub fn verify_count(&self) -> usize {
        self.verifies.load(Ordering::SeqCst)
    }
}

impl Authentication for CountingAuthentication {
    fn sign(
        &self,
        controller: &mut RepositoryController,
        license: &License,
    ) -> Result<Decoder, KeywrightError> {
        self.signs.fetch_add(1, Ordering::SeqCst);
        self.inner.sign(controller, license)
    }

    fn verify(&self, controller: &RepositoryController) -> Result<Decoder, KeywrightError> {
        self.verifies.fetch_add(1, Ordering::SeqCst);
        self.inner.verify(controller)
    }
}

/// Counts reads on its way through to the wrapped store.
pub struct CountingStore {
    inner: Arc<dyn Store>,
    reads: AtomicUsize,
}

impl CountingStore {
    pub fn wrap(inner: Arc<dyn Store>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            reads: AtomicUsize::new(0),
        })
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl Source for CountingStore {
    fn token(&self) -> SourceToken {
        self.inner.token()
    }

    fn read(&self) -> Result<Vec<u8>, KeywrightError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.read()
    }
}

impl Sink for CountingStore {
    fn write(&self, data: &[u8]) -> Result<(), KeywrightError> {
        self.inner.write(data)
    }
}

impl Store for CountingStore {
    fn exists(&self) -> Result<bool, KeywrightError> {
        self.inner.exists()
    }

    fn delete(&self) -> Result<(), KeywrightError> {
        self.inner.delete()
    }
}

/// A store whose writes and deletes always fail.
pub struct ReadOnlyStore {
    inner: Arc<dyn Store>,
}

impl ReadOnlyStore {
    pub fn wrap(inner: Arc<dyn Store>) -> Arc<Self> {
        Arc::new(Self { inner })
    }
}

impl Source for ReadOnlyStore {
    fn token(&self) -> SourceToken {
        self.inner.token()
    }

    fn read(&self) -> Result<Vec<u8>, KeywrightError> {
        self.inner.read()
    }
}

impl Sink for ReadOnlyStore {
    fn write(&self, _data: &[u8]) -> Result<(), KeywrightError> {
        Err(KeywrightError::Store("store is read-only".to_string()))
    }
}

impl Store for ReadOnlyStore {
    fn exists(&self) -> Result<bool, KeywrightError> {
        self.inner.exists()
    }

    fn delete(&self) -> Result<(), KeywrightError> {
        Err(KeywrightError::Store("store is read-only".to_string()))
    }
}
