//! Parameter records accepted by the request service.
//!
//! Optional fields carry caller intent; defaults are applied when the
//! records are turned into store write records.

use serde::{Deserialize, Deserializer, Serialize};

use db::models::{NewRequestItem, RequestStatus};

/// Quantity used when an item does not specify one.
pub const DEFAULT_QUANTITY: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemInput {
    pub name: String,
    #[serde(default)]
    pub quantity: Option<i32>,
}

impl ItemInput {
    pub fn new(name: impl Into<String>, quantity: Option<i32>) -> Self {
        Self { name: name.into(), quantity }
    }

    pub(crate) fn to_record(&self) -> NewRequestItem {
        NewRequestItem {
            name: self.name.clone(),
            quantity: self.quantity.unwrap_or(DEFAULT_QUANTITY),
        }
    }
}

pub(crate) fn to_records(items: &[ItemInput]) -> Vec<NewRequestItem> {
    items.iter().map(ItemInput::to_record).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub employee_id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    /// Defaults to `pending`.
    #[serde(default)]
    pub status: Option<RequestStatus>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub items: Vec<ItemInput>,
}

/// Changes to an existing request. Absent fields keep their stored value.
///
/// `description` and `items` distinguish absent from cleared: a `null`
/// description (`Some(None)`) removes it, and for `items`, `None` leaves the
/// items alone, `Some(vec![])` removes all of them, and a populated vector
/// replaces them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRequest {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub status: Option<RequestStatus>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub items: Option<Vec<ItemInput>>,
}

/// Wraps whatever the key held, `null` included, in `Some`; together with
/// `#[serde(default)]` a missing key stays `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_quantity_defaults_to_one() {
        let record = ItemInput::new("Mouse", None).to_record();
        assert_eq!(record.quantity, DEFAULT_QUANTITY);
    }

    #[test]
    fn update_body_keeps_absent_and_empty_items_apart() {
        let absent: UpdateRequest = serde_json::from_str(r#"{ "status": "approved" }"#).unwrap();
        let empty: UpdateRequest = serde_json::from_str(r#"{ "items": [] }"#).unwrap();

        assert_eq!(absent.items, None);
        assert_eq!(absent.status, Some(RequestStatus::Approved));
        assert_eq!(empty.items, Some(vec![]));
    }

    #[test]
    fn update_body_keeps_absent_and_null_description_apart() {
        let absent: UpdateRequest = serde_json::from_str(r#"{}"#).unwrap();
        let cleared: UpdateRequest = serde_json::from_str(r#"{ "description": null }"#).unwrap();
        let set: UpdateRequest = serde_json::from_str(r#"{ "description": "dock" }"#).unwrap();

        assert_eq!(absent.description, None);
        assert_eq!(cleared.description, Some(None));
        assert_eq!(set.description, Some(Some("dock".to_string())));
    }

    #[test]
    fn create_body_uses_type_key_and_optional_status() {
        let body: CreateRequest = serde_json::from_str(
            r#"{
                "employee_id": 1,
                "type": "equipment",
                "items": [{ "name": "Laptop" }, { "name": "Mouse", "quantity": 2 }]
            }"#,
        )
        .unwrap();

        assert_eq!(body.kind, "equipment");
        assert_eq!(body.status, None);
        assert_eq!(body.items[0].quantity, None);
        assert_eq!(body.items[1].quantity, Some(2));
    }
}
