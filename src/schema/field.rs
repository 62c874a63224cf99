//! Declarative entity schemas
//!
//! A [`Schema`] is the ordered list of canonical fields an entity kind is
//! expected to carry. It is built once from static configuration and never
//! changes afterwards; conformance checking, decoding and table creation all
//! read from it instead of inspecting Rust types at runtime.

use crate::error::ConfigError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

static CANONICAL_IDENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Z][A-Za-z0-9]*$").expect("canonical identifier pattern is valid")
});

static COLUMN_IDENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z_][a-z0-9_]*$").expect("column identifier pattern is valid")
});

/// Value kind of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    /// List or object of arbitrary shape, stored as encoded text
    Nested,
}

impl FieldKind {
    /// Column type used when the field is persisted
    pub fn sql_type(self) -> &'static str {
        match self {
            FieldKind::Text | FieldKind::Nested => "TEXT",
            FieldKind::Integer => "INTEGER",
            FieldKind::Float => "REAL",
        }
    }
}

impl FromStr for FieldKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "string" => Ok(FieldKind::Text),
            "integer" | "int" => Ok(FieldKind::Integer),
            "float" | "number" => Ok(FieldKind::Float),
            "nested" => Ok(FieldKind::Nested),
            other => Err(ConfigError::UnknownFieldKind(other.to_string())),
        }
    }
}

impl TryFrom<String> for FieldKind {
    type Error = ConfigError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A single canonical field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    kind: FieldKind,
    column: String,
}

impl Field {
    /// Declare a field. The first letter is upper-cased, so `hitDice` and
    /// `HitDice` name the same field.
    pub fn new(name: impl AsRef<str>, kind: FieldKind) -> Self {
        let name = canonical_form(name.as_ref());
        let column = column_name(&name);
        Field { name, kind, column }
    }

    pub fn text(name: impl AsRef<str>) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub fn integer(name: impl AsRef<str>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn float(name: impl AsRef<str>) -> Self {
        Self::new(name, FieldKind::Float)
    }

    pub fn nested(name: impl AsRef<str>) -> Self {
        Self::new(name, FieldKind::Nested)
    }

    /// Store the field under a different column than the derived one
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn column(&self) -> &str {
        &self.column
    }
}

/// Ordered, immutable set of canonical fields
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<Field>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// Build a schema, rejecting duplicate or malformed identifiers
    pub fn new(fields: Vec<Field>) -> Result<Self, ConfigError> {
        let mut index = HashMap::with_capacity(fields.len());
        let mut columns = HashSet::with_capacity(fields.len());

        for (position, field) in fields.iter().enumerate() {
            if !CANONICAL_IDENT_REGEX.is_match(&field.name) {
                return Err(ConfigError::InvalidIdentifier(field.name.clone()));
            }
            if !COLUMN_IDENT_REGEX.is_match(&field.column) || field.column == "id" {
                return Err(ConfigError::InvalidIdentifier(field.column.clone()));
            }
            if index.insert(field.name.clone(), position).is_some() {
                return Err(ConfigError::DuplicateField(field.name.clone()));
            }
            if !columns.insert(field.column.clone()) {
                return Err(ConfigError::DuplicateColumn(field.column.clone()));
            }
        }

        Ok(Schema { fields, index })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, canonical: &str) -> bool {
        self.index.contains_key(canonical)
    }

    pub fn get(&self, canonical: &str) -> Option<&Field> {
        self.index.get(canonical).map(|&i| &self.fields[i])
    }

    /// Position of a field in declaration order
    pub fn position(&self, canonical: &str) -> Option<usize> {
        self.index.get(canonical).copied()
    }
}

/// Upper-case the first character of an identifier
pub fn canonical_form(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Derive a snake_case column name from a canonical identifier.
///
/// Runs of capitals are kept together, so `HP` becomes `hp` and
/// `DocumentLicenseUrl` becomes `document_license_url`.
pub fn column_name(canonical: &str) -> String {
    let chars: Vec<char> = canonical.chars().collect();
    let mut out = String::with_capacity(canonical.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower) {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names() {
        assert_eq!(column_name("Name"), "name");
        assert_eq!(column_name("HpAtFirstLevel"), "hp_at_first_level");
        assert_eq!(column_name("HP"), "hp");
        assert_eq!(column_name("DocumentLicenseUrl"), "document_license_url");
        assert_eq!(column_name("ABCField"), "abc_field");
    }

    #[test]
    fn test_canonical_form_capitalises_first_letter() {
        let field = Field::text("hitDice");
        assert_eq!(field.name(), "HitDice");
        assert_eq!(field.column(), "hit_dice");
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let result = Schema::new(vec![Field::text("Name"), Field::integer("name")]);
        assert!(matches!(result, Err(ConfigError::DuplicateField(name)) if name == "Name"));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let result = Schema::new(vec![
            Field::text("Group").with_column("group_name"),
            Field::text("GroupName"),
        ]);
        assert!(matches!(result, Err(ConfigError::DuplicateColumn(column)) if column == "group_name"));
    }

    #[test]
    fn test_invalid_identifier_rejected() {
        let result = Schema::new(vec![Field::text("hit dice")]);
        assert!(matches!(result, Err(ConfigError::InvalidIdentifier(_))));

        let result = Schema::new(vec![Field::text("Id")]);
        assert!(matches!(result, Err(ConfigError::InvalidIdentifier(column)) if column == "id"));
    }

    #[test]
    fn test_lookup_preserves_order() {
        let schema = Schema::new(vec![
            Field::text("Name"),
            Field::integer("ArmorClass"),
            Field::nested("Actions"),
        ])
        .unwrap();

        assert_eq!(schema.len(), 3);
        assert_eq!(schema.position("ArmorClass"), Some(1));
        assert_eq!(schema.get("Actions").unwrap().kind(), FieldKind::Nested);
        assert!(!schema.contains("Speed"));
    }

    #[test]
    fn test_field_kind_parsing() {
        assert_eq!("nested".parse::<FieldKind>().unwrap(), FieldKind::Nested);
        assert_eq!("Integer".parse::<FieldKind>().unwrap(), FieldKind::Integer);
        assert!("blob".parse::<FieldKind>().is_err());
    }
}
