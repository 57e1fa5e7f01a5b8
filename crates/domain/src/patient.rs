//! Patient document wire model.

use crate::Address;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

fn default_on_active_treatment() -> bool {
    true
}

/// A patient document as stored in the document database.
///
/// Identity is twofold: the store-assigned document [`id`](Patient::id) (absent
/// until the document is first persisted) and the business
/// [`patient_id`](Patient::patient_id), whose uniqueness is not enforced here.
/// The [`revision`](Patient::revision) is the store's opaque optimistic-
/// concurrency token; it is round-tripped, never interpreted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// Store-assigned document identifier.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Store-managed revision token for optimistic concurrency.
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,

    /// Business patient identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,

    /// Full name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Contact phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,

    /// Date of birth (ISO 8601 calendar date).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<NaiveDate>,

    /// Whether the patient is currently under active treatment.
    #[serde(default = "default_on_active_treatment")]
    pub on_active_treatment: bool,

    /// Age in years.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,

    /// Postal addresses, in insertion order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<Address>,
}

impl Default for Patient {
    fn default() -> Self {
        Self {
            id: None,
            revision: None,
            patient_id: None,
            name: None,
            phone_number: None,
            dob: None,
            on_active_treatment: true,
            age: None,
            addresses: Vec::new(),
        }
    }
}

impl Patient {
    /// Creates an empty patient record (active treatment defaults to `true`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the given addresses, returning the patient for chaining.
    pub fn with_addresses(mut self, addresses: impl IntoIterator<Item = Address>) -> Self {
        self.addresses.extend(addresses);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_patient() -> Patient {
        Patient {
            patient_id: Some("17".into()),
            name: Some("name17".into()),
            phone_number: Some("0123456".into()),
            dob: NaiveDate::from_ymd_opt(2010, 1, 1),
            age: Some(21),
            ..Patient::new()
        }
    }

    #[test]
    fn test_active_treatment_defaults_to_true() {
        assert!(Patient::new().on_active_treatment);

        // A document without the field deserialises to the default too.
        let patient: Patient = serde_json::from_str(r#"{"name":"n"}"#).unwrap();
        assert!(patient.on_active_treatment);
    }

    #[test]
    fn test_id_and_revision_use_store_field_names() {
        let mut patient = sample_patient();
        patient.id = Some("doc-1".into());
        patient.revision = Some("1-abc".into());

        let json = serde_json::to_value(&patient).unwrap();
        assert_eq!(json["_id"], "doc-1");
        assert_eq!(json["_rev"], "1-abc");
        assert_eq!(json["patientId"], "17");
        assert_eq!(json["dob"], "2010-01-01");
    }

    #[test]
    fn test_unsaved_patient_serialises_without_id_or_revision() {
        let json = serde_json::to_value(sample_patient()).unwrap();
        assert!(json.get("_id").is_none());
        assert!(json.get("_rev").is_none());
    }

    #[test]
    fn test_wire_round_trip_preserves_all_fields() {
        let original = sample_patient().with_addresses([Address::new(
            "addr1", "street1", "city1", "state1",
        )]);

        let json = serde_json::to_string(&original).unwrap();
        let parsed: Patient = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, original);
    }

    #[test]
    fn test_with_addresses_appends_in_order() {
        let patient = Patient::new()
            .with_addresses([Address::new("a1", "s1", "c1", "st1")])
            .with_addresses([Address::new("a2", "s2", "c2", "st2")]);

        assert_eq!(patient.addresses.len(), 2);
        assert_eq!(patient.addresses[0].city.as_deref(), Some("c1"));
        assert_eq!(patient.addresses[1].city.as_deref(), Some("c2"));
    }
}
