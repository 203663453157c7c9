//! The vendor-side license manager.

use super::{KeyGenerator, ManagerParameters, Pipeline, UncheckedVendorManager};
use crate::context::LicenseContext;
use crate::errors::KeywrightError;
use crate::license::License;

/// Generates license keys on the vendor side.
///
/// Built by [`LicenseContext::vendor`]; holds no store and no parent.
pub struct VendorManager {
    pipeline: Pipeline,
}

impl VendorManager {
    pub(crate) fn new(context: LicenseContext, parameters: ManagerParameters) -> Self {
        Self {
            pipeline: Pipeline::new(context, parameters),
        }
    }

    /// Clears the generate gate and returns a lazy [`KeyGenerator`] over a
    /// private copy of `bean`.
    pub fn generate_key_from(&self, bean: &License) -> Result<KeyGenerator, KeywrightError> {
        self.pipeline.generate_key_from(bean)
    }

    /// The context this manager was built from.
    pub fn context(&self) -> &LicenseContext {
        &self.pipeline.context
    }

    /// This manager's parameters.
    pub fn parameters(&self) -> &ManagerParameters {
        &self.pipeline.parameters
    }

    /// A view of this manager whose operations return the flattened
    /// [`UncheckedError`](crate::errors::UncheckedError).
    pub fn unchecked(&self) -> UncheckedVendorManager<'_> {
        UncheckedVendorManager::new(self)
    }
}
