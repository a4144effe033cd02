use serde::{Deserialize, Serialize};

use crate::core::error::CarrierError;

/// The Alias for serde_json::Value since every carrier field is one
pub type FieldValue = serde_json::Value;

/// The record that travels down a pipeline from unit to unit.
///
/// Units never look inside a carrier; they hand it to their delegate and pass
/// whatever comes back along. Fields are plain JSON values keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Carrier {
    fields: serde_json::Map<String, FieldValue>,
}

impl Carrier {
    /// Creates an empty carrier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a carrier from a JSON object. Any other value is handed back
    /// inside the error.
    pub fn from_json(value: FieldValue) -> Result<Self, CarrierError> {
        match value {
            FieldValue::Object(fields) => Ok(Carrier { fields }),
            other => Err(CarrierError::NotAnObject(other)),
        }
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Sets `key` and hands the carrier back, so calls can be chained.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Sets `key` in place, returning the previous value if there was one.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.fields.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Consumes the carrier into a JSON object.
    pub fn into_json(self) -> FieldValue {
        FieldValue::Object(self.fields)
    }
}

impl TryFrom<FieldValue> for Carrier {
    type Error = CarrierError;

    fn try_from(value: FieldValue) -> Result<Self, Self::Error> {
        Carrier::from_json(value)
    }
}

impl From<serde_json::Map<String, FieldValue>> for Carrier {
    fn from(fields: serde_json::Map<String, FieldValue>) -> Self {
        Carrier { fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_chains_and_get_reads_back() {
        let carrier = Carrier::new().set("a", 1).set("b", "two");
        assert_eq!(carrier.get("a"), Some(&json!(1)));
        assert_eq!(carrier.get("b"), Some(&json!("two")));
        assert_eq!(carrier.get("missing"), None);
        assert_eq!(carrier.len(), 2);
    }

    #[test]
    fn test_insert_returns_previous_value() {
        let mut carrier = Carrier::new();
        assert_eq!(carrier.insert("v", 1), None);
        assert_eq!(carrier.insert("v", 2), Some(json!(1)));
        assert_eq!(carrier.remove("v"), Some(json!(2)));
        assert!(carrier.is_empty());
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        let err = Carrier::from_json(json!(42)).unwrap_err();
        assert_eq!(err.to_string(), "carrier must be a JSON object, got 42");
        assert_eq!(err.into_value(), json!(42));

        let err = Carrier::try_from(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, CarrierError::NotAnObject(_)));
        assert!(serde_json::from_value::<Carrier>(json!([1, 2, 3])).is_err());

        let carrier = Carrier::from_json(json!({ "a": 1, "b": 2 })).unwrap();
        assert!(carrier.contains("a"));
        assert_eq!(carrier.into_json(), json!({ "a": 1, "b": 2 }));
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let carrier = Carrier::new().set("k", true);
        let text = serde_json::to_string(&carrier).unwrap();
        assert_eq!(text, r#"{"k":true}"#);
    }
}
