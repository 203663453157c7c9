//! License validation: the default rules and the user hook.

use crate::context::LicenseContext;
use crate::errors::KeywrightError;
use crate::license::License;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// A license bean failed validation.
///
/// Variants are stable identifiers for the individual rules; time-window
/// failures carry the offending boundary and subject mismatches carry both
/// sides.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// The consumer amount is zero or negative.
    #[error("consumer amount {0} is not positive")]
    ConsumerAmountNotPositive(i32),

    /// The consumer type is not set.
    #[error("consumer type is not set")]
    ConsumerTypeMissing,

    /// The holder is not set.
    #[error("holder is not set")]
    HolderMissing,

    /// The issue date/time is not set.
    #[error("issue date/time is not set")]
    IssuedMissing,

    /// The issuer is not set.
    #[error("issuer is not set")]
    IssuerMissing,

    /// The validity window has closed.
    #[error("license has expired at {0}")]
    Expired(DateTime<Utc>),

    /// The validity window has not opened yet.
    #[error("license is not valid before {0}")]
    NotYetValid(DateTime<Utc>),

    /// The bean's subject does not match the managing context's subject.
    #[error("invalid subject {actual:?}, expected {expected:?}")]
    SubjectMismatch {
        /// The subject the context manages.
        expected: String,
        /// The subject found in the bean.
        actual: String,
    },

    /// A user-supplied validation failed with a custom message.
    #[error("{0}")]
    Custom(String),
}

/// Validates a license bean.
pub trait LicenseValidation: Send + Sync {
    /// Checks the bean, failing with a [`KeywrightError::Validation`] if it
    /// violates any rule.
    fn validate(&self, bean: &License) -> Result<(), KeywrightError>;
}

/// The built-in validation.
///
/// Checks the consumer amount, the mandatory fields, the validity window
/// against the context clock, and the subject against the context subject.
pub struct DefaultValidation {
    context: LicenseContext,
}

impl DefaultValidation {
    pub(crate) fn new(context: LicenseContext) -> Self {
        Self { context }
    }
}

impl LicenseValidation for DefaultValidation {
    fn validate(&self, bean: &License) -> Result<(), KeywrightError> {
        if bean.consumer_amount <= 0 {
            return Err(ValidationError::ConsumerAmountNotPositive(bean.consumer_amount).into());
        }
        if bean.consumer_type.is_none() {
            return Err(ValidationError::ConsumerTypeMissing.into());
        }
        if bean.holder.is_none() {
            return Err(ValidationError::HolderMissing.into());
        }
        if bean.issued.is_none() {
            return Err(ValidationError::IssuedMissing.into());
        }
        if bean.issuer.is_none() {
            return Err(ValidationError::IssuerMissing.into());
        }
        // Read time through the context, not the system clock.
        let now = self.context.now_utc();
        if let Some(not_after) = bean.not_after {
            if now > not_after {
                return Err(ValidationError::Expired(not_after).into());
            }
        }
        if let Some(not_before) = bean.not_before {
            if now < not_before {
                return Err(ValidationError::NotYetValid(not_before).into());
            }
        }
        if bean.subject.as_deref() != Some(self.context.subject()) {
            return Err(ValidationError::SubjectMismatch {
                expected: self.context.subject().to_string(),
                actual: bean.subject.clone().unwrap_or_default(),
            }
            .into());
        }
        Ok(())
    }
}
