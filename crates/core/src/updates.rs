//! Typed partial updates decoded from request bodies.
//!
//! A body is accepted only if it is a JSON object whose keys all appear on the resource's
//! allow-list and whose values decode into the typed update. Either check failing rejects the
//! whole body, so an update is never half applied.

use crate::account::{Account, EmergencyContact};
use crate::allow_list::{validate_fields, ResourceKind};
use crate::{AccountError, AccountResult};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use telehealth_types::{EmailAddress, NonEmptyText};

/// A validated update of one account resource.
pub trait PartialUpdate: DeserializeOwned {
    const KIND: ResourceKind;

    /// Assigns exactly the submitted fields onto `account`.
    fn apply(self, account: &mut Account);

    /// Checks the key set against the allow-list, then decodes the values.
    fn from_body(body: Value) -> AccountResult<Self> {
        let Value::Object(map) = body else {
            return Err(AccountError::InvalidUpdate(
                "request body must be a JSON object".into(),
            ));
        };

        validate_fields(Self::KIND, &map)?;

        serde_json::from_value(Value::Object(map))
            .map_err(|e| AccountError::InvalidUpdate(e.to_string()))
    }
}

/// Present-but-null becomes `Some(None)`; absent stays `None` through `#[serde(default)]`.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A present field must carry a value; `null` is a decode error.
fn non_null<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfileUpdate {
    #[serde(default, deserialize_with = "non_null")]
    pub name: Option<NonEmptyText>,
    #[serde(default, deserialize_with = "non_null")]
    pub email: Option<EmailAddress>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub dob: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub emergency_contact: Option<Option<EmergencyContact>>,
}

impl PartialUpdate for ProfileUpdate {
    const KIND: ResourceKind = ResourceKind::Profile;

    fn apply(self, account: &mut Account) {
        if let Some(name) = self.name {
            account.name = name;
        }
        if let Some(email) = self.email {
            account.email = email;
        }
        if let Some(phone) = self.phone {
            account.phone = phone;
        }
        if let Some(dob) = self.dob {
            account.dob = dob;
        }
        if let Some(address) = self.address {
            account.address = address;
        }
        if let Some(contact) = self.emergency_contact {
            account.emergency_contact = contact;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MedicalHistoryUpdate {
    #[serde(default, deserialize_with = "non_null")]
    pub allergies: Option<Vec<String>>,
    #[serde(default, deserialize_with = "non_null")]
    pub medications: Option<Vec<String>>,
    #[serde(default, deserialize_with = "non_null")]
    pub surgeries: Option<Vec<String>>,
    #[serde(default, deserialize_with = "non_null")]
    pub conditions: Option<Vec<String>>,
    #[serde(default, deserialize_with = "non_null")]
    pub family_history: Option<Vec<String>>,
}

impl PartialUpdate for MedicalHistoryUpdate {
    const KIND: ResourceKind = ResourceKind::MedicalHistory;

    fn apply(self, account: &mut Account) {
        let history = &mut account.medical_history;
        if let Some(allergies) = self.allergies {
            history.allergies = allergies;
        }
        if let Some(medications) = self.medications {
            history.medications = medications;
        }
        if let Some(surgeries) = self.surgeries {
            history.surgeries = surgeries;
        }
        if let Some(conditions) = self.conditions {
            history.conditions = conditions;
        }
        if let Some(family_history) = self.family_history {
            history.family_history = family_history;
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PrivacySettingsUpdate {
    #[serde(default, deserialize_with = "non_null")]
    pub share_data: Option<bool>,
    #[serde(default, deserialize_with = "non_null")]
    pub email_notifications: Option<bool>,
    #[serde(default, deserialize_with = "non_null")]
    pub sms_notifications: Option<bool>,
}

impl PartialUpdate for PrivacySettingsUpdate {
    const KIND: ResourceKind = ResourceKind::PrivacySettings;

    fn apply(self, account: &mut Account) {
        let settings = &mut account.privacy_settings;
        if let Some(share_data) = self.share_data {
            settings.share_data = share_data;
        }
        if let Some(email_notifications) = self.email_notifications {
            settings.email_notifications = email_notifications;
        }
        if let Some(sms_notifications) = self.sms_notifications {
            settings.sms_notifications = sms_notifications;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{PrivacySettings, Role};
    use crate::password::PasswordHash;
    use serde_json::json;

    fn account() -> Account {
        Account::new(
            NonEmptyText::new("jdoe").unwrap(),
            NonEmptyText::new("Jane Doe").unwrap(),
            EmailAddress::parse("jane@example.com").unwrap(),
            Role::Patient,
            PasswordHash::generate("secret1", 1).unwrap(),
        )
    }

    fn assert_invalid<T: PartialUpdate + std::fmt::Debug>(body: Value) {
        let result = T::from_body(body.clone());
        assert!(
            matches!(result, Err(AccountError::InvalidUpdate(_))),
            "{body} should be rejected, got {result:?}"
        );
    }

    #[test]
    fn test_profile_update_changes_only_submitted_fields() {
        let mut account = account();
        account.phone = Some("555-0100".into());
        let before = account.clone();

        ProfileUpdate::from_body(json!({"name": "Jane Q. Doe", "dob": "1990-01-15"}))
            .unwrap()
            .apply(&mut account);

        assert_eq!(account.name.as_str(), "Jane Q. Doe");
        assert_eq!(account.dob, NaiveDate::from_ymd_opt(1990, 1, 15));
        assert_eq!(account.phone, before.phone);
        assert_eq!(account.email, before.email);
        assert_eq!(account.address, before.address);
    }

    #[test]
    fn test_profile_null_clears_optional_fields() {
        let mut account = account();
        account.phone = Some("555-0100".into());
        account.emergency_contact = Some(EmergencyContact {
            name: "John".into(),
            phone: "555-0199".into(),
        });

        ProfileUpdate::from_body(json!({"phone": null, "emergencyContact": null}))
            .unwrap()
            .apply(&mut account);

        assert_eq!(account.phone, None);
        assert_eq!(account.emergency_contact, None);
    }

    #[test]
    fn test_profile_rejects_bad_values() {
        assert_invalid::<ProfileUpdate>(json!({"name": null}));
        assert_invalid::<ProfileUpdate>(json!({"name": "   "}));
        assert_invalid::<ProfileUpdate>(json!({"email": null}));
        assert_invalid::<ProfileUpdate>(json!({"email": "not-an-email"}));
        assert_invalid::<ProfileUpdate>(json!({"dob": "15/01/1990"}));
        assert_invalid::<ProfileUpdate>(json!({"phone": 5550100}));
        assert_invalid::<ProfileUpdate>(json!({"emergencyContact": {"name": "John"}}));
    }

    #[test]
    fn test_disallowed_keys_reject_before_decoding() {
        assert_invalid::<ProfileUpdate>(json!({"role": "doctor"}));
        assert_invalid::<ProfileUpdate>(json!({"password": "hunter22"}));
        assert_invalid::<ProfileUpdate>(json!({"name": "Ok", "medicalHistory": {}}));
        assert_invalid::<PrivacySettingsUpdate>(json!({"allergies": []}));
    }

    #[test]
    fn test_non_object_bodies_are_rejected() {
        assert_invalid::<ProfileUpdate>(json!(null));
        assert_invalid::<ProfileUpdate>(json!(["name"]));
        assert_invalid::<PrivacySettingsUpdate>(json!("shareData"));
    }

    #[test]
    fn test_empty_body_is_a_no_op() {
        let mut account = account();
        let before = account.view();
        ProfileUpdate::from_body(json!({}))
            .unwrap()
            .apply(&mut account);
        assert_eq!(account.view(), before);
    }

    #[test]
    fn test_medical_history_replaces_lists() {
        let mut account = account();
        account.medical_history.conditions = vec!["asthma".into()];

        MedicalHistoryUpdate::from_body(json!({"allergies": ["penicillin", "latex"]}))
            .unwrap()
            .apply(&mut account);

        assert_eq!(account.medical_history.allergies, vec!["penicillin", "latex"]);
        assert_eq!(account.medical_history.conditions, vec!["asthma"]);
        assert_invalid::<MedicalHistoryUpdate>(json!({"allergies": "penicillin"}));
        assert_invalid::<MedicalHistoryUpdate>(json!({"familyHistory": null}));
    }

    #[test]
    fn test_privacy_update_on_defaults() {
        let mut account = account();
        PrivacySettingsUpdate::from_body(json!({"shareData": false}))
            .unwrap()
            .apply(&mut account);

        assert_eq!(
            account.privacy_settings,
            PrivacySettings {
                share_data: false,
                email_notifications: true,
                sms_notifications: true,
            }
        );
        assert_invalid::<PrivacySettingsUpdate>(json!({"smsNotifications": "no"}));
    }
}
