//! License initialization: filling unset fields before signing.

use crate::context::LicenseContext;
use crate::license::License;

/// The canonical name prefix for distinguished names.
const CN_PREFIX: &str = "CN=";

const DEFAULT_CONSUMER_TYPE: &str = "User";
const UNKNOWN_HOLDER: &str = "unknown";

/// Initializes a license bean before validation and signing.
pub trait LicenseInitialization: Send + Sync {
    /// Fills unset fields of the bean. Must not overwrite fields that are
    /// already set.
    fn initialize(&self, bean: &mut License);
}

/// The built-in initialization.
///
/// Fills the consumer type, holder, issue date/time (from the context
/// clock), issuer, and subject unless these are respectively set already.
pub struct DefaultInitialization {
    context: LicenseContext,
}

impl DefaultInitialization {
    pub(crate) fn new(context: LicenseContext) -> Self {
        Self { context }
    }
}

impl LicenseInitialization for DefaultInitialization {
    fn initialize(&self, bean: &mut License) {
        if bean.consumer_type.is_none() {
            bean.consumer_type = Some(DEFAULT_CONSUMER_TYPE.to_string());
        }
        if bean.holder.is_none() {
            bean.holder = Some(format!("{}{}", CN_PREFIX, UNKNOWN_HOLDER));
        }
        if bean.issued.is_none() {
            // Read time through the context, not the system clock.
            bean.issued = Some(self.context.now_utc());
        }
        if bean.issuer.is_none() {
            bean.issuer = Some(format!("{}{}", CN_PREFIX, self.context.subject()));
        }
        if bean.subject.is_none() {
            bean.subject = Some(self.context.subject().to_string());
        }
    }
}
