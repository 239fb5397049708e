//! Per-resource field allow-lists for partial updates.

use crate::{AccountError, AccountResult};
use serde_json::{Map, Value};

/// Resource an update body targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Profile,
    MedicalHistory,
    PrivacySettings,
}

impl ResourceKind {
    /// Wire names of the fields a body for this resource may contain.
    pub fn allowed_fields(self) -> &'static [&'static str] {
        match self {
            ResourceKind::Profile => &[
                "name",
                "email",
                "phone",
                "dob",
                "address",
                "emergencyContact",
            ],
            ResourceKind::MedicalHistory => &[
                "allergies",
                "medications",
                "surgeries",
                "conditions",
                "familyHistory",
            ],
            ResourceKind::PrivacySettings => {
                &["shareData", "emailNotifications", "smsNotifications"]
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Profile => "profile",
            ResourceKind::MedicalHistory => "medical history",
            ResourceKind::PrivacySettings => "privacy settings",
        }
    }
}

/// Fails with `InvalidUpdate` unless every key of `body` is allowed for `kind`.
///
/// The error lists all rejected keys in sorted order. An empty body passes.
pub fn validate_fields(kind: ResourceKind, body: &Map<String, Value>) -> AccountResult<()> {
    let allowed = kind.allowed_fields();
    let mut rejected: Vec<&str> = body
        .keys()
        .map(String::as_str)
        .filter(|key| !allowed.contains(key))
        .collect();

    if rejected.is_empty() {
        return Ok(());
    }

    rejected.sort_unstable();
    Err(AccountError::InvalidUpdate(format!(
        "fields not allowed on {}: {}",
        kind.as_str(),
        rejected.join(", ")
    )))
}
