//! Account document and its read-only projection.
//!
//! [`Account`] is the stored document, including the password credential. Everything that
//! leaves the core for a client goes through [`AccountView`], which has no credential field,
//! so the "password is never returned" invariant holds by construction.

use crate::password::PasswordHash;
use crate::{AccountError, AccountId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use telehealth_types::{EmailAddress, NonEmptyText};

/// Account role; drives the role gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            other => Err(AccountError::InvalidInput(format!(
                "role must be 'patient' or 'doctor', got '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalHistory {
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub surgeries: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub family_history: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacySettings {
    pub share_data: bool,
    pub email_notifications: bool,
    pub sms_notifications: bool,
}

/// New accounts opt in to everything; the patient narrows it from the privacy page.
impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            share_data: true,
            email_notifications: true,
            sms_notifications: true,
        }
    }
}

/// Stored account document.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    pub username: NonEmptyText,
    pub name: NonEmptyText,
    pub email: EmailAddress,
    pub role: Role,
    pub password_hash: PasswordHash,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub emergency_contact: Option<EmergencyContact>,
    #[serde(default)]
    pub medical_history: MedicalHistory,
    #[serde(default)]
    pub privacy_settings: PrivacySettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Builds a freshly registered account with default history and privacy settings.
    pub fn new(
        username: NonEmptyText,
        name: NonEmptyText,
        email: EmailAddress,
        role: Role,
        password_hash: PasswordHash,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AccountId::new(),
            username,
            name,
            email,
            role,
            password_hash,
            phone: None,
            dob: None,
            address: None,
            emergency_contact: None,
            medical_history: MedicalHistory::default(),
            privacy_settings: PrivacySettings::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn view(&self) -> AccountView {
        AccountView::from(self)
    }
}

/// Account as seen by clients: every field except the password credential.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: AccountId,
    pub username: NonEmptyText,
    pub name: NonEmptyText,
    pub email: EmailAddress,
    pub role: Role,
    pub phone: Option<String>,
    pub dob: Option<NaiveDate>,
    pub address: Option<String>,
    pub emergency_contact: Option<EmergencyContact>,
    pub medical_history: MedicalHistory,
    pub privacy_settings: PrivacySettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            username: account.username.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
            role: account.role,
            phone: account.phone.clone(),
            dob: account.dob,
            address: account.address.clone(),
            emergency_contact: account.emergency_contact.clone(),
            medical_history: account.medical_history.clone(),
            privacy_settings: account.privacy_settings,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}
