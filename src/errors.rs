//! Keywright error types.

use crate::validate::ValidationError;
use thiserror::Error;

/// Errors surfaced by license management operations.
#[derive(Debug, Error)]
pub enum KeywrightError {
    /// A builder received missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// An authorization gate refused the operation.
    #[error("operation not authorized: {0}")]
    AuthorizationDenied(String),

    /// Signature verification failed, the keystore is unreadable, or a
    /// password is wrong.
    #[error("authentication failure: {0}")]
    Authentication(String),

    /// The license bean violates the default or a user-supplied validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Encoding or decoding through the codec failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// I/O error reading, writing, or deleting a store, source, or sink.
    #[error("store error: {0}")]
    Store(String),

    /// A secret failed the password policy on write usage.
    #[error("password policy violation: {0}")]
    PasswordPolicy(String),

    /// Any other failure.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl From<std::io::Error> for KeywrightError {
    fn from(e: std::io::Error) -> Self {
        KeywrightError::Store(e.to_string())
    }
}

/// Opaque failure type returned by the unchecked manager facades.
///
/// Every domain failure is flattened into this single wrapper; `Display`
/// passes the underlying message through unchanged and the original
/// [`KeywrightError`] stays reachable via [`UncheckedError::into_inner`].
#[derive(Debug, Error)]
#[error(transparent)]
pub struct UncheckedError(#[from] KeywrightError);

impl UncheckedError {
    /// Returns the wrapped domain failure.
    pub fn into_inner(self) -> KeywrightError {
        self.0
    }
}
