//! Authorization gates for license management operations.

use crate::context::LicenseContext;
use crate::errors::KeywrightError;

/// Clears license management operations before any I/O or cryptography
/// runs.
///
/// Every gate defaults to permitting the operation; an implementation
/// denies by returning [`KeywrightError::AuthorizationDenied`] (or any
/// other error) from the gates it cares about.
pub trait Authorization: Send + Sync {
    /// Clears generating a license key.
    fn clear_generate(&self, _context: &LicenseContext) -> Result<(), KeywrightError> {
        Ok(())
    }

    /// Clears installing a license key.
    fn clear_install(&self, _context: &LicenseContext) -> Result<(), KeywrightError> {
        Ok(())
    }

    /// Clears loading the installed license.
    fn clear_load(&self, _context: &LicenseContext) -> Result<(), KeywrightError> {
        Ok(())
    }

    /// Clears verifying the installed license.
    fn clear_verify(&self, _context: &LicenseContext) -> Result<(), KeywrightError> {
        Ok(())
    }

    /// Clears uninstalling the license key.
    fn clear_uninstall(&self, _context: &LicenseContext) -> Result<(), KeywrightError> {
        Ok(())
    }
}

/// The default authorization: every operation is permitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermitAllAuthorization;

impl Authorization for PermitAllAuthorization {}
