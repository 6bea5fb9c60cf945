use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::api::ApiError;

/// Every backend response is wrapped as `{ success, data, message }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Envelope<Value> {
    /// The `data` payload, or JSON `null` when the server sent none.
    pub fn into_data(self) -> Value {
        self.data.unwrap_or(Value::Null)
    }
}

/// Convert a cached or freshly fetched JSON payload into a typed value.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_with_missing_fields() {
        let env: Envelope<Value> = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert_eq!(env.success, Some(true));
        assert_eq!(env.into_data(), Value::Null);
    }

    #[test]
    fn test_decode_mismatch_is_invalid_response() {
        let err = decode::<Vec<String>>(serde_json::json!({"not": "a list"})).unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse(_)));
    }
}
