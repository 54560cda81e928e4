//! Versioned description of the transaction feature schema.
//!
//! The schema is checked into configuration rather than inferred from a
//! sampled dataset row at startup, so the service and the trainer agree on
//! field names and types across deployments.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Field types accepted in transaction records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Int,
    Float,
    Text,
    Bool,
}

impl FieldType {
    /// Whether values of this type land in a numeric frame column.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, FieldType::Text)
    }
}

/// One named, typed field of the transaction schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub dtype: FieldType,
}

impl FieldSpec {
    pub fn new(name: &str, dtype: FieldType) -> Self {
        FieldSpec {
            name: name.to_string(),
            dtype,
        }
    }
}

/// Ordered feature fields, excluding the label column.
pub type Schema = Vec<FieldSpec>;

/// A single field value as it arrives in a JSON request body.
///
/// Untagged so that plain JSON scalars deserialize directly; `Null` marks a
/// missing value and is imputed downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// One inbound transaction record, field name to value.
pub type Record = HashMap<String, FieldValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_value_deserializes_from_json_scalars() {
        let record: Record = serde_json::from_str(
            r#"{"amount": 12.5, "step": 3, "type": "TRANSFER", "flagged": false, "memo": null}"#,
        )
        .unwrap();
        assert_eq!(record["amount"], FieldValue::Float(12.5));
        assert_eq!(record["step"], FieldValue::Int(3));
        assert_eq!(record["type"], FieldValue::Text("TRANSFER".to_string()));
        assert_eq!(record["flagged"], FieldValue::Bool(false));
        assert_eq!(record["memo"], FieldValue::Null);
    }

    #[test]
    fn schema_round_trips_json() {
        let schema: Schema = vec![
            FieldSpec::new("amount", FieldType::Float),
            FieldSpec::new("type", FieldType::Text),
        ];
        let json = serde_json::to_string(&schema).unwrap();
        let parsed: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].dtype, FieldType::Text);
    }
}
