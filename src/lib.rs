//! # Keywright
//!
//! **Offline software license lifecycle engine for Rust.**
//!
//! Keywright generates, installs, loads, verifies, and uninstalls
//! cryptographically signed license keys. A key is a license bean encoded
//! through a codec, wrapped in a signed repository model, compressed, and
//! sealed with password-based encryption — fully verifiable offline with
//! nothing but a keystore holding the vendor's verifying key.
//!
//! ## Features
//!
//! - **Ed25519 signatures** — keys are signed by the vendor and verified on
//!   every load; tampered or unsigned artifacts never reach the store
//! - **Password-based encryption** — Argon2id-derived ChaCha20-Poly1305 over
//!   the compressed artifact, with weak passwords rejected at signing time
//! - **Cached verification** — authentication results are memoized per
//!   source with a configurable time-to-live
//! - **Chained managers** — a consumer can defer to a parent manager and
//!   fall back to auto-generating a free-trial key when none is installed
//! - **Injectable collaborators** — codec, compression, encryption, clock,
//!   authorization, and validation are all seams
//!
//! ## Quickstart
//!
//! ```no_run
//! use keywright::codec::JsonCodec;
//! use keywright::crypto::compress::DeflateCompression;
//! use keywright::crypto::encrypt::{StandardEncryptionFactory, CHACHA20_POLY1305};
//! use keywright::io::PathStore;
//! use keywright::license::StandardLicenseFactory;
//! use keywright::manager::ManagerBuilder as _;
//! use keywright::passwd::StaticPasswordProtection;
//! use keywright::repository::StandardRepositoryContext;
//! use keywright::LicenseContext;
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), keywright::KeywrightError> {
//!     let context = LicenseContext::builder()
//!         .subject("MyApp")
//!         .codec(Arc::new(JsonCodec))
//!         .compression(Arc::new(DeflateCompression::default()))
//!         .encryption_algorithm(CHACHA20_POLY1305)
//!         .encryption_factory(Arc::new(StandardEncryptionFactory))
//!         .license_factory(Arc::new(StandardLicenseFactory))
//!         .repository_context(Arc::new(StandardRepositoryContext))
//!         .keystore_type("json")
//!         .build()?;
//!
//!     let manager = context
//!         .consumer()
//!         .authentication()
//!         .alias("myapp")
//!         .store_protection(Arc::new(StaticPasswordProtection::new("changeit-42")))
//!         .load_from_path("/etc/myapp/keystore.json")
//!         .up()?
//!         .encryption()
//!         .protection(Arc::new(StaticPasswordProtection::new("changeit-42")))
//!         .up()?
//!         .store_in(Arc::new(PathStore::new("/var/lib/myapp/license.key")))
//!         .build()?;
//!
//!     let license = manager.load()?;
//!     manager.verify()?;
//!     println!("licensed to {:?}", license.holder);
//!     Ok(())
//! }
//! ```
//!
//! ## Threat Model
//!
//! Keywright protects against tampered, forged, and replayed license
//! artifacts: anything that fails signature verification is rejected before
//! it touches the store, and uninstalling authenticates first. It does
//! **not** prevent binary patching — client-side licensing is a speed bump
//! plus signature-based trust, not DRM.

#![deny(missing_docs)]

// Core seams
pub mod codec;
pub mod errors;
pub mod io;

// Data model
pub mod license;
pub mod repository;

// Crypto layer
pub mod auth;
pub mod crypto;
pub mod passwd;

// Policy layer
pub mod authz;
pub mod init;
pub mod validate;

// Context and managers (main public API)
pub mod context;
pub mod manager;

// Re-exports for the public API
pub use context::{Clock, ContextBuilder, FunctionComposition, LicenseContext, SystemClock};
pub use errors::{KeywrightError, UncheckedError};
pub use license::License;
pub use manager::{ConsumerManager, KeyGenerator, ManagerParameters, VendorManager};
