use crate::error::{IngestError, Result};
use crate::schema::{FieldKind, Schema};
use serde_json::{Map, Value};

/// One undecoded element of a page's `results` array
pub type RawRecord = Map<String, Value>;

/// A decoded, schema-typed value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    /// Structured data, serialized only when the record becomes a [`Row`]
    Nested(Value),
}

impl FieldValue {
    /// Value used when the wire record does not carry the field
    pub fn zero(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Text => FieldValue::Text(String::new()),
            FieldKind::Integer => FieldValue::Integer(0),
            FieldKind::Float => FieldValue::Float(0.0),
            FieldKind::Nested => FieldValue::Nested(Value::Array(Vec::new())),
        }
    }

    pub fn as_nested(&self) -> Option<&Value> {
        match self {
            FieldValue::Nested(v) => Some(v),
            _ => None,
        }
    }
}

/// A schema-conformant entity: one value per schema field, in schema order
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Vec<FieldValue>,
}

impl Record {
    pub fn new(values: Vec<FieldValue>) -> Self {
        Record { values }
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<FieldValue> {
        self.values
    }

    /// Look a value up by canonical field name
    pub fn get<'a>(&'a self, schema: &Schema, canonical: &str) -> Option<&'a FieldValue> {
        schema.position(canonical).and_then(|i| self.values.get(i))
    }
}

/// Where pagination goes after the current page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cursor {
    Next(String),
    Done,
}

impl Cursor {
    pub fn is_done(&self) -> bool {
        matches!(self, Cursor::Done)
    }

    pub fn next_url(&self) -> Option<&str> {
        match self {
            Cursor::Next(url) => Some(url),
            Cursor::Done => None,
        }
    }
}

/// One page of upstream results
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Upstream's total item count; informational only
    pub count: Option<u64>,
    pub records: Vec<RawRecord>,
    pub cursor: Cursor,
}

impl Page {
    /// Parse a response body, trying SIMD parsing before falling back to serde_json
    pub fn parse(body: &[u8]) -> Result<Self> {
        let mut scratch = body.to_vec();
        let value: Value = match simd_json::serde::from_slice(&mut scratch) {
            Ok(value) => value,
            Err(_) => serde_json::from_slice(body)
                .map_err(|e| IngestError::MalformedPage(format!("invalid JSON: {e}")))?,
        };
        Self::from_value(value)
    }

    /// Split a decoded response envelope into records and cursor.
    ///
    /// `next` that is null, absent or not a string ends pagination.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut envelope) = value else {
            return Err(IngestError::MalformedPage(
                "top-level value is not an object".to_string(),
            ));
        };

        let records = match envelope.remove("results") {
            Some(Value::Array(items)) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::Object(obj) => Ok(obj),
                    other => Err(IngestError::MalformedPage(format!(
                        "result {i} is not an object: {other}"
                    ))),
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => {
                return Err(IngestError::MalformedPage(
                    "'results' is not an array".to_string(),
                ))
            }
            None => {
                return Err(IngestError::MalformedPage(
                    "missing 'results' array".to_string(),
                ))
            }
        };

        let cursor = match envelope.remove("next") {
            Some(Value::String(url)) if !url.is_empty() => Cursor::Next(url),
            _ => Cursor::Done,
        };

        let count = envelope.get("count").and_then(Value::as_u64);

        Ok(Page {
            count,
            records,
            cursor,
        })
    }
}

/// A storage cell; nested values have already been encoded to text
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Integer(i64),
    Float(f64),
}

/// Flattened, storage-ready form of a [`Record`]
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub cells: Vec<Cell>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_last_page() {
        let body = br#"{"count": 1, "next": null, "previous": null,
                        "results": [{"name": "Fighter"}]}"#;
        let page = Page::parse(body).unwrap();

        assert_eq!(page.count, Some(1));
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0]["name"], json!("Fighter"));
        assert!(page.cursor.is_done());
    }

    #[test]
    fn test_parse_page_with_next() {
        let page = Page::from_value(json!({
            "next": "https://example.test/v1/classes/?page=2",
            "results": []
        }))
        .unwrap();

        assert_eq!(page.cursor.next_url(), Some("https://example.test/v1/classes/?page=2"));
        assert!(page.records.is_empty());
    }

    #[test]
    fn test_absent_next_terminates() {
        let page = Page::from_value(json!({"results": [{"a": 1}]})).unwrap();
        assert_eq!(page.cursor, Cursor::Done);
        assert_eq!(page.count, None);
    }

    #[test]
    fn test_malformed_pages() {
        assert!(matches!(Page::from_value(json!([1, 2])), Err(IngestError::MalformedPage(_))));
        assert!(matches!(
            Page::from_value(json!({"results": {"name": "x"}})),
            Err(IngestError::MalformedPage(_))
        ));
        assert!(matches!(
            Page::from_value(json!({"next": null})),
            Err(IngestError::MalformedPage(_))
        ));
        assert!(matches!(
            Page::from_value(json!({"results": ["Fighter"]})),
            Err(IngestError::MalformedPage(_))
        ));
        assert!(matches!(Page::parse(b"not json"), Err(IngestError::MalformedPage(_))));
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(FieldValue::zero(FieldKind::Text), FieldValue::Text(String::new()));
        assert_eq!(FieldValue::zero(FieldKind::Integer), FieldValue::Integer(0));
        assert_eq!(FieldValue::zero(FieldKind::Nested), FieldValue::Nested(json!([])));
    }
}
