//! Policy documents: trust policies, inline and managed policies, bucket policies.
//!
//! The document is kept as parsed JSON. Nothing here interprets statements; the only
//! structural requirement is that the body is a JSON object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{SnapshotError, SnapshotResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolicyDocument(Value);

impl PolicyDocument {
    /// A document with no fields at all.
    pub fn empty() -> Self {
        Self(Value::Object(Map::new()))
    }

    /// Parse a policy document from plain JSON.
    pub fn from_json(json: &str) -> SnapshotResult<Self> {
        let value: Value = serde_json::from_str(json).map_err(|e| {
            SnapshotError::policy_document(format!("Failed to parse policy document JSON: {e}"))
        })?;
        Self::from_value(value)
    }

    /// Parse a URL-encoded policy document, as IAM returns them.
    pub fn from_encoded_json(encoded: &str) -> SnapshotResult<Self> {
        let decoded = percent_encoding::percent_decode_str(encoded)
            .decode_utf8()
            .map_err(|e| {
                SnapshotError::policy_document(format!(
                    "Failed to URL decode policy document: {e}"
                ))
            })?;
        Self::from_json(&decoded)
    }

    pub fn from_value(value: Value) -> SnapshotResult<Self> {
        if !value.is_object() {
            return Err(SnapshotError::policy_document(
                "Policy document must be a JSON object",
            ));
        }
        Ok(Self(value))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Pretty-printed JSON, the form written to configuration files.
    pub fn to_json_pretty(&self) -> SnapshotResult<String> {
        serde_json::to_string_pretty(&self.0).map_err(|e| {
            SnapshotError::policy_document(format!("Failed to serialize policy document: {e}"))
        })
    }
}
