//! Schema-driven record decoding
//!
//! Decoding walks the schema, not the payload: every schema field gets
//! exactly one value, coerced to its declared kind, and wire keys with no
//! schema field are ignored here (the conformance checker reports them).

use crate::error::{IngestError, Result};
use crate::ingest::types::{FieldValue, RawRecord, Record};
use crate::schema::{Field, FieldKind, FieldNormalizer, Schema};
use serde_json::Value;
use tracing::debug;

/// Decodes raw records into typed [`Record`]s
#[derive(Debug, Clone, Copy)]
pub struct RecordDecoder<'a> {
    schema: &'a Schema,
    normalizer: &'a FieldNormalizer,
}

impl<'a> RecordDecoder<'a> {
    pub fn new(schema: &'a Schema, normalizer: &'a FieldNormalizer) -> Self {
        RecordDecoder { schema, normalizer }
    }

    /// Decode one raw record. `index` is its position on the page and is
    /// only used for error reporting.
    pub fn decode(&self, index: usize, raw: &RawRecord) -> Result<Record> {
        let sources = self.wire_sources(raw);

        let values = self
            .schema
            .fields()
            .iter()
            .zip(sources)
            .map(|(field, source)| match source {
                Some(value) => coerce(field, value).map_err(|reason| IngestError::Decode {
                    index,
                    field: field.name().to_string(),
                    reason,
                }),
                None => Ok(FieldValue::zero(field.kind())),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Record::new(values))
    }

    /// For each schema field, the wire value that feeds it.
    ///
    /// When several wire keys normalize to the same field, a key matched by
    /// an explicit rename beats one matched by plain transliteration; among
    /// equals the first key in document order wins.
    fn wire_sources<'r>(&self, raw: &'r RawRecord) -> Vec<Option<&'r Value>> {
        let mut sources: Vec<Option<(&'r Value, bool)>> = vec![None; self.schema.len()];

        for (key, value) in raw {
            let resolution = self.normalizer.resolve(key);
            let Some(position) = self.schema.position(&resolution.canonical) else {
                continue;
            };

            let current = sources[position];
            match current {
                Some((_, true)) => {
                    debug!(key = %key, field = %resolution.canonical, "ignoring shadowed wire key");
                }
                Some((_, false)) if !resolution.renamed => {
                    debug!(key = %key, field = %resolution.canonical, "ignoring shadowed wire key");
                }
                _ => sources[position] = Some((value, resolution.renamed)),
            }
        }

        sources
            .into_iter()
            .map(|source| source.map(|(value, _)| value))
            .collect()
    }
}

/// Coerce a wire value to a field's declared kind. `null` reads as the
/// kind's zero value.
fn coerce(field: &Field, value: &Value) -> std::result::Result<FieldValue, String> {
    if value.is_null() {
        return Ok(FieldValue::zero(field.kind()));
    }

    match field.kind() {
        FieldKind::Text => match value {
            Value::String(s) => Ok(FieldValue::Text(s.clone())),
            Value::Number(n) => Ok(FieldValue::Text(n.to_string())),
            Value::Bool(b) => Ok(FieldValue::Text(b.to_string())),
            other => Err(format!("expected text, found {}", describe(other))),
        },
        FieldKind::Integer => match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(FieldValue::Integer(i))
                } else {
                    match n.as_f64() {
                        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                            Ok(FieldValue::Integer(f as i64))
                        }
                        _ => Err(format!("{n} is not an integer")),
                    }
                }
            }
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(FieldValue::Integer)
                .map_err(|_| format!("'{s}' is not an integer")),
            other => Err(format!("expected integer, found {}", describe(other))),
        },
        FieldKind::Float => match value {
            Value::Number(n) => n
                .as_f64()
                .map(FieldValue::Float)
                .ok_or_else(|| format!("{n} is not representable as a float")),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(FieldValue::Float)
                .map_err(|_| format!("'{s}' is not a number")),
            other => Err(format!("expected number, found {}", describe(other))),
        },
        FieldKind::Nested => match value {
            Value::Array(_) | Value::Object(_) => Ok(FieldValue::Nested(value.clone())),
            other => Err(format!("expected list or object, found {}", describe(other))),
        },
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
