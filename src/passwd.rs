//! Password protection and strength policy.
//!
//! Secrets are pulled through a [`PasswordProtection`] at the moment they
//! are needed, tagged with how they will be used: [`PasswordUsage::Write`]
//! when the secret is about to protect something new (encrypting a key,
//! unlocking a signing key), [`PasswordUsage::Read`] when it merely unlocks
//! existing material. Strength checking happens only on write usage, so a
//! weak password is rejected at key generation or installation time rather
//! than at configuration time.

use crate::errors::KeywrightError;
use std::fmt;
use std::sync::Arc;
use zeroize::Zeroizing;

/// How a requested password is about to be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordUsage {
    /// The secret unlocks existing material.
    Read,
    /// The secret is about to protect new material.
    Write,
}

/// A password in a buffer that is zeroed on drop.
pub struct Password {
    secret: Zeroizing<Vec<u8>>,
}

impl Password {
    /// Wraps the given bytes.
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            secret: Zeroizing::new(secret),
        }
    }

    /// The raw secret bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.secret
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Password").field("secret", &"[REDACTED]").finish()
    }
}

/// Supplies a password on demand.
pub trait PasswordProtection: Send + Sync {
    /// Returns the protected password for the given usage.
    fn password(&self, usage: PasswordUsage) -> Result<Password, KeywrightError>;
}

/// Password protection over a fixed in-memory secret.
pub struct StaticPasswordProtection {
    secret: Zeroizing<Vec<u8>>,
}

impl StaticPasswordProtection {
    /// Wraps the given passphrase.
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Zeroizing::new(secret.as_bytes().to_vec()),
        }
    }
}

impl PasswordProtection for StaticPasswordProtection {
    fn password(&self, _usage: PasswordUsage) -> Result<Password, KeywrightError> {
        Ok(Password::new(self.secret.to_vec()))
    }
}

/// Checks password strength before write usage.
pub trait PasswordPolicy: Send + Sync {
    /// Checks the password supplied by `protection`; fails with
    /// [`KeywrightError::PasswordPolicy`] if it is too weak.
    fn check(&self, protection: &dyn PasswordProtection) -> Result<(), KeywrightError>;
}

/// The default strength rule: at least eight characters, containing both
/// letters and digits.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinimumPasswordPolicy;

impl PasswordPolicy for MinimumPasswordPolicy {
    fn check(&self, protection: &dyn PasswordProtection) -> Result<(), KeywrightError> {
        let password = protection.password(PasswordUsage::Read)?;
        let secret = password.as_bytes();
        if secret.len() < 8 {
            return Err(KeywrightError::PasswordPolicy(
                "password must contain at least eight characters".to_string(),
            ));
        }
        let has_letter = secret.iter().any(|b| b.is_ascii_alphabetic());
        let has_digit = secret.iter().any(|b| b.is_ascii_digit());
        if !has_letter || !has_digit {
            return Err(KeywrightError::PasswordPolicy(
                "password must contain both letters and digits".to_string(),
            ));
        }
        Ok(())
    }
}

/// Wraps a protection so that the policy runs before every write usage.
///
/// Read usage passes straight through.
pub struct CheckedPasswordProtection {
    protection: Arc<dyn PasswordProtection>,
    policy: Arc<dyn PasswordPolicy>,
}

impl CheckedPasswordProtection {
    /// Wraps `protection` with `policy`.
    pub fn new(protection: Arc<dyn PasswordProtection>, policy: Arc<dyn PasswordPolicy>) -> Self {
        Self { protection, policy }
    }
}

impl PasswordProtection for CheckedPasswordProtection {
    fn password(&self, usage: PasswordUsage) -> Result<Password, KeywrightError> {
        if usage == PasswordUsage::Write {
            self.policy.check(self.protection.as_ref())?;
        }
        self.protection.password(usage)
    }
}
