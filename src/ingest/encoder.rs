//! Text encoding for nested field values
//!
//! The store has no list or object column type, so nested values are kept as
//! compact JSON text. Object keys come out sorted, which makes the encoding
//! canonical: equal values always encode to the same text.

use crate::error::{IngestError, Result};
use crate::ingest::types::{Cell, FieldValue, Record, Row};
use crate::schema::Schema;
use serde_json::Value;

/// Encodes nested values to text and back
#[derive(Debug, Clone, Copy, Default)]
pub struct NestedValueEncoder;

impl NestedValueEncoder {
    pub fn encode(value: &Value) -> serde_json::Result<String> {
        serde_json::to_string(&canonicalize(value))
    }

    pub fn decode(text: &str) -> serde_json::Result<Value> {
        serde_json::from_str(text)
    }

    /// Flatten a record into a row, encoding its nested fields
    pub fn flatten(schema: &Schema, record: Record) -> Result<Row> {
        let cells = schema
            .fields()
            .iter()
            .zip(record.into_values())
            .map(|(field, value)| match value {
                FieldValue::Text(s) => Ok(Cell::Text(s)),
                FieldValue::Integer(n) => Ok(Cell::Integer(n)),
                FieldValue::Float(n) => Ok(Cell::Float(n)),
                FieldValue::Nested(v) => Self::encode(&v)
                    .map(Cell::Text)
                    .map_err(|source| IngestError::Encode {
                        field: field.name().to_string(),
                        source,
                    }),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Row { cells })
    }
}

/// Rebuild objects with sorted keys, independent of how the map type orders them
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Object(obj) => {
            let mut entries: Vec<(&String, &Value)> = obj.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;
    use serde_json::json;

    #[test]
    fn test_round_trip() {
        let values = vec![
            json!([]),
            json!({}),
            json!([{"name": "Multiattack", "desc": "The dragon makes three attacks."}]),
            json!({"walk": 40, "fly": 80, "hover": true}),
            json!(["fireball", "shield", null, 2.5, -3]),
            json!({"deep": {"list": [[1, 2], {"x": "y"}]}}),
            json!("a plain string"),
        ];

        for value in values {
            let text = NestedValueEncoder::encode(&value).unwrap();
            assert_eq!(NestedValueEncoder::decode(&text).unwrap(), value);
        }
    }

    #[test]
    fn test_encoding_is_compact_and_sorted() {
        let text = NestedValueEncoder::encode(&json!({"walk": 30, "climb": 20})).unwrap();
        assert_eq!(text, r#"{"climb":20,"walk":30}"#);
    }

    #[test]
    fn test_flatten_encodes_only_nested_fields() {
        let schema = Schema::new(vec![
            Field::text("Name"),
            Field::integer("Strength"),
            Field::float("ChallengeRating"),
            Field::nested("Archetypes"),
        ])
        .unwrap();
        let record = Record::new(vec![
            FieldValue::Text("Druid".into()),
            FieldValue::Integer(10),
            FieldValue::Float(0.5),
            FieldValue::Nested(json!([{"name": "Circle of the Moon"}])),
        ]);

        let row = NestedValueEncoder::flatten(&schema, record).unwrap();

        assert_eq!(
            row.cells,
            vec![
                Cell::Text("Druid".into()),
                Cell::Integer(10),
                Cell::Float(0.5),
                Cell::Text(r#"[{"name":"Circle of the Moon"}]"#.into()),
            ]
        );
    }
}
