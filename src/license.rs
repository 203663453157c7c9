//! The license bean and its factory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A license bean: the mutable record of license terms that gets signed,
/// packaged, and later verified.
///
/// Field invariants (positive amount, mandatory holder/issuer/issued/subject,
/// validity window) are enforced by the configured validation, not by this
/// type. A bean is freely editable until it enters the key generation
/// pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    /// Number of consumers covered by this license.
    #[serde(default = "default_consumer_amount")]
    pub consumer_amount: i32,

    /// Kind of consumer, e.g. `"User"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumer_type: Option<String>,

    /// Distinguished name of the license holder, e.g. `"CN=Alice"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder: Option<String>,

    /// Distinguished name of the issuing party.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// When the license was issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued: Option<DateTime<Utc>>,

    /// Start of the validity window, if bounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,

    /// End of the validity window, if bounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_after: Option<DateTime<Utc>>,

    /// Product identifier; must match the managing context's subject.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Free-form vendor extension data, carried through the pipeline
    /// verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

fn default_consumer_amount() -> i32 {
    1
}

impl Default for License {
    fn default() -> Self {
        Self {
            consumer_amount: 1,
            consumer_type: None,
            holder: None,
            issuer: None,
            issued: None,
            not_before: None,
            not_after: None,
            subject: None,
            extra: None,
        }
    }
}

/// Produces the template bean used when a manager needs a license of its
/// own, e.g. for free-trial generation.
pub trait LicenseFactory: Send + Sync {
    /// Returns a fresh license bean.
    fn license(&self) -> License;
}

/// Factory for the default, empty bean.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardLicenseFactory;

impl LicenseFactory for StandardLicenseFactory {
    fn license(&self) -> License {
        License::default()
    }
}
