//! Embedded address value object.

use serde::{Deserialize, Serialize};

/// A postal address embedded in a patient document.
///
/// Addresses have no independent identity: they are owned exclusively by their
/// containing [`Patient`](crate::Patient) and serialised inline with it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// First address line (house/flat and building).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line1: Option<String>,
    /// Street name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    /// City or town.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// State or region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl Address {
    /// Creates an address with all four components populated.
    pub fn new(
        address_line1: impl Into<String>,
        street: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
    ) -> Self {
        Self {
            address_line1: Some(address_line1.into()),
            street: Some(street.into()),
            city: Some(city.into()),
            state: Some(state.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialises_with_camel_case_field_names() {
        let address = Address::new("addr1", "street1", "city1", "state1");
        let json = serde_json::to_value(&address).unwrap();

        assert_eq!(json["addressLine1"], "addr1");
        assert_eq!(json["street"], "street1");
        assert_eq!(json["city"], "city1");
        assert_eq!(json["state"], "state1");
    }

    #[test]
    fn test_omits_absent_components() {
        let address = Address {
            city: Some("city1".into()),
            ..Address::default()
        };
        let json = serde_json::to_value(&address).unwrap();

        assert!(json.get("addressLine1").is_none());
        assert!(json.get("street").is_none());
        assert_eq!(json["city"], "city1");
    }
}
