use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TypeError;
use crate::layer::NAME_FIELD;

/// Field of a state document that holds the ordered layer list.
pub const LAYERS_FIELD: &str = "layers";

/// Top-level JSON object a client saves and loads.
///
/// Apart from locating the `layers` array the contents are opaque.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateDocument(Map<String, Value>);

impl StateDocument {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Parse a client payload. The top-level value must be a JSON object.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| TypeError::InvalidJson(e.to_string()))?;
        Self::try_from(value)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, TypeError> {
        serde_json::to_vec(&self.0).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// The `layers` array, when present and actually an array.
    pub fn layers(&self) -> Option<&Vec<Value>> {
        self.0.get(LAYERS_FIELD).and_then(Value::as_array)
    }

    pub fn layers_mut(&mut self) -> Option<&mut Vec<Value>> {
        self.0.get_mut(LAYERS_FIELD).and_then(Value::as_array_mut)
    }

    /// `true` when a `layers` key exists but does not hold an array.
    pub fn has_malformed_layers(&self) -> bool {
        self.0.get(LAYERS_FIELD).is_some_and(|v| !v.is_array())
    }

    /// Names of all layers that carry a string `name`, in document order.
    pub fn layer_names(&self) -> Vec<&str> {
        self.layers()
            .map(|layers| {
                layers
                    .iter()
                    .filter_map(|l| l.get(NAME_FIELD).and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for StateDocument {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for StateDocument {
    type Error = TypeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Err(TypeError::NotAnObject("null")),
            Value::Bool(_) => Err(TypeError::NotAnObject("boolean")),
            Value::Number(_) => Err(TypeError::NotAnObject("number")),
            Value::String(_) => Err(TypeError::NotAnObject("string")),
            Value::Array(_) => Err(TypeError::NotAnObject("array")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_object() {
        let doc = StateDocument::from_slice(br#"{"a": 1, "layers": []}"#).unwrap();
        assert_eq!(doc.get("a"), Some(&json!(1)));
        assert_eq!(doc.layers().map(Vec::len), Some(0));
    }

    #[test]
    fn rejects_non_object() {
        assert_eq!(
            StateDocument::from_slice(b"[1,2]"),
            Err(TypeError::NotAnObject("array"))
        );
        assert!(matches!(
            StateDocument::from_slice(b"{not json"),
            Err(TypeError::InvalidJson(_))
        ));
    }

    #[test]
    fn malformed_layers_are_detected() {
        let doc = StateDocument::try_from(json!({"layers": {"name": "x"}})).unwrap();
        assert!(doc.layers().is_none());
        assert!(doc.has_malformed_layers());
    }

    #[test]
    fn layer_names_in_order() {
        let doc = StateDocument::try_from(json!({
            "layers": [{"name": "a"}, {"type": "unnamed"}, {"name": "READ:b"}, 5]
        }))
        .unwrap();
        assert_eq!(doc.layer_names(), vec!["a", "READ:b"]);
    }

    #[test]
    fn serializes_back_to_same_value() {
        let value = json!({"x": [1, 2, {"y": null}], "layers": [{"name": "a", "k": true}]});
        let doc = StateDocument::try_from(value.clone()).unwrap();
        let bytes = doc.to_vec().unwrap();
        let back: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, value);
    }
}
