//! Update bodies accepted by the LPA store
//!
//! An update is a typed set of JSON-pointer-style changes; the store
//! applies each change only if the `old` value still matches.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single field change within an update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub key: String,
    pub old: Value,
    pub new: Value,
}

impl Change {
    /// A change that sets a previously unset field
    pub fn set(key: impl Into<String>, new: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            old: Value::Null,
            new: new.into(),
        }
    }
}

/// Request body for `POST /lpas/{uid}/updates`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    #[serde(rename = "type")]
    pub update_type: String,
    pub changes: Vec<Change>,
}

impl UpdateRequest {
    pub fn new(update_type: impl Into<String>, changes: Vec<Change>) -> Self {
        Self {
            update_type: update_type.into(),
            changes,
        }
    }

    /// Record that the attorney at `index` signed at the given time
    pub fn attorney_sign(index: usize, signed_at: &str) -> Self {
        Self::new(
            "ATTORNEY_SIGN",
            vec![Change::set(format!("/attorneys/{}/signedAt", index), signed_at)],
        )
    }

    /// Record that the certificate provider signed at the given time
    pub fn certificate_provider_sign(signed_at: &str) -> Self {
        Self::new(
            "CERTIFICATE_PROVIDER_SIGN",
            vec![Change::set("/certificateProvider/signedAt", signed_at)],
        )
    }

    /// Record the donor's identity check
    pub fn donor_confirm_identity(checked_at: &str, id_type: &str) -> Self {
        Self::new(
            "DONOR_CONFIRM_IDENTITY",
            vec![
                Change::set("/donor/identityCheck/checkedAt", checked_at),
                Change::set("/donor/identityCheck/type", id_type),
            ],
        )
    }

    /// Record the certificate provider's identity check
    pub fn certificate_provider_confirm_identity(checked_at: &str, id_type: &str) -> Self {
        Self::new(
            "CERTIFICATE_PROVIDER_CONFIRM_IDENTITY",
            vec![
                Change::set("/certificateProvider/identityCheck/checkedAt", checked_at),
                Change::set("/certificateProvider/identityCheck/type", id_type),
            ],
        )
    }
}
