//! Request and response bodies as they appear on the wire.
//!
//! Field names are camelCase to match the single-page frontend. Response types convert from
//! the core projections, never from the stored `Account`, so no credential can reach a body.

use serde::{Deserialize, Serialize};
use telehealth_core::{AccountView, AuthSession, EmergencyContact, MedicalHistory, PrivacySettings};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Body of every failure response, and of success responses that carry only a message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MessageRes {
    pub message: String,
}

impl MessageRes {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterReq {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
    /// `patient` or `doctor`
    pub role: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginReq {
    pub username: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordReq {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EmergencyContactRes {
    pub name: String,
    pub phone: String,
}

impl From<EmergencyContact> for EmergencyContactRes {
    fn from(contact: EmergencyContact) -> Self {
        Self {
            name: contact.name,
            phone: contact.phone,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MedicalHistoryRes {
    pub allergies: Vec<String>,
    pub medications: Vec<String>,
    pub surgeries: Vec<String>,
    pub conditions: Vec<String>,
    pub family_history: Vec<String>,
}

impl From<MedicalHistory> for MedicalHistoryRes {
    fn from(history: MedicalHistory) -> Self {
        Self {
            allergies: history.allergies,
            medications: history.medications,
            surgeries: history.surgeries,
            conditions: history.conditions,
            family_history: history.family_history,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrivacySettingsRes {
    pub share_data: bool,
    pub email_notifications: bool,
    pub sms_notifications: bool,
}

impl From<PrivacySettings> for PrivacySettingsRes {
    fn from(settings: PrivacySettings) -> Self {
        Self {
            share_data: settings.share_data,
            email_notifications: settings.email_notifications,
            sms_notifications: settings.sms_notifications,
        }
    }
}

/// An account as returned to clients. There is no password field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserRes {
    pub id: String,
    pub username: String,
    pub name: String,
    pub email: String,
    /// `patient` or `doctor`
    pub role: String,
    pub phone: Option<String>,
    /// `YYYY-MM-DD`
    pub dob: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<EmergencyContactRes>,
    pub medical_history: MedicalHistoryRes,
    pub privacy_settings: PrivacySettingsRes,
    pub created_at: String,
    pub updated_at: String,
}

impl From<AccountView> for UserRes {
    fn from(view: AccountView) -> Self {
        Self {
            id: view.id.to_string(),
            username: view.username.to_string(),
            name: view.name.to_string(),
            email: view.email.to_string(),
            role: view.role.to_string(),
            phone: view.phone,
            dob: view.dob.map(|dob| dob.format("%Y-%m-%d").to_string()),
            address: view.address,
            emergency_contact: view.emergency_contact.map(EmergencyContactRes::from),
            medical_history: view.medical_history.into(),
            privacy_settings: view.privacy_settings.into(),
            created_at: view.created_at.to_rfc3339(),
            updated_at: view.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthRes {
    pub token: String,
    /// RFC 3339 instant after which the token is rejected.
    pub expires_at: String,
    pub user: UserRes,
}

impl From<AuthSession> for AuthRes {
    fn from(session: AuthSession) -> Self {
        Self {
            token: session.token,
            expires_at: session.expires_at.to_rfc3339(),
            user: session.account.into(),
        }
    }
}

// Documentation-only bodies for the partial-update endpoints. Handlers take the raw JSON
// object so that unknown keys can be reported against the allow-list.

/// Any subset of the profile fields. `null` clears `phone`, `dob`, `address` and
/// `emergencyContact`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateReq {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// `YYYY-MM-DD`
    pub dob: Option<String>,
    pub address: Option<String>,
    pub emergency_contact: Option<EmergencyContactRes>,
}

/// Any subset of the medical-history lists; each submitted list replaces the stored one.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MedicalHistoryUpdateReq {
    pub allergies: Option<Vec<String>>,
    pub medications: Option<Vec<String>>,
    pub surgeries: Option<Vec<String>>,
    pub conditions: Option<Vec<String>>,
    pub family_history: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrivacySettingsUpdateReq {
    pub share_data: Option<bool>,
    pub email_notifications: Option<bool>,
    pub sms_notifications: Option<bool>,
}
