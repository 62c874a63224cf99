//! Detection of wire fields the schema does not know about
//!
//! Unknown fields never stop ingestion. They are reported so upstream API
//! additions can be noticed and folded into the schema by hand.

use crate::schema::field::Schema;
use crate::schema::normalize::FieldNormalizer;
use serde_json::{Map, Value};
use tracing::warn;

/// Key some endpoints add to every record; it carries no entity data
pub const DEFAULT_PAGINATION_KEY: &str = "page_no";

/// A wire field with no counterpart in the schema
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownField {
    pub key: String,
    pub canonical: String,
    pub value: Value,
}

/// Compares raw records against a schema
#[derive(Debug, Clone, Copy)]
pub struct SchemaConformanceChecker<'a> {
    schema: &'a Schema,
    normalizer: &'a FieldNormalizer,
    pagination_key: &'a str,
}

impl<'a> SchemaConformanceChecker<'a> {
    pub fn new(schema: &'a Schema, normalizer: &'a FieldNormalizer, pagination_key: &'a str) -> Self {
        SchemaConformanceChecker {
            schema,
            normalizer,
            pagination_key,
        }
    }

    /// Every key whose normalized form is outside the schema, in document order
    pub fn check(&self, record: &Map<String, Value>) -> Vec<UnknownField> {
        record
            .iter()
            .filter(|(key, _)| key.as_str() != self.pagination_key)
            .filter_map(|(key, value)| {
                let canonical = self.normalizer.normalize(key);
                if self.schema.contains(&canonical) {
                    None
                } else {
                    Some(UnknownField {
                        key: key.clone(),
                        canonical,
                        value: value.clone(),
                    })
                }
            })
            .collect()
    }

    /// Check and log each unknown field
    pub fn report(&self, record: &Map<String, Value>) -> Vec<UnknownField> {
        let unknown = self.check(record);
        for field in &unknown {
            warn!(
                key = %field.key,
                canonical = %field.canonical,
                value = %field.value,
                "field not present in schema"
            );
        }
        unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::field::Field;
    use crate::schema::normalize::NormalizationRules;
    use serde_json::json;

    fn fixture() -> (Schema, FieldNormalizer) {
        let schema = Schema::new(vec![
            Field::text("Name"),
            Field::text("HitDice"),
            Field::text("HpAtFirstLevel"),
        ])
        .unwrap();
        let rules = NormalizationRules::new().rename("hp_at_1st_level", "HpAtFirstLevel");
        (schema, FieldNormalizer::new(&rules))
    }

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_conforming_record_has_no_reports() {
        let (schema, normalizer) = fixture();
        let checker = SchemaConformanceChecker::new(&schema, &normalizer, DEFAULT_PAGINATION_KEY);

        let record = object(json!({
            "name": "Fighter",
            "hit_dice": "1d10",
            "hp_at_1st_level": "10 + your Constitution modifier",
            "page_no": 1
        }));

        assert!(checker.check(&record).is_empty());
    }

    #[test]
    fn test_flags_exactly_unknown_keys() {
        let (schema, normalizer) = fixture();
        let checker = SchemaConformanceChecker::new(&schema, &normalizer, DEFAULT_PAGINATION_KEY);

        let record = object(json!({
            "name": "Wizard",
            "totally_new_field": {"a": 1},
            "spellcasting_ability": "Intelligence",
            "page_no": 3
        }));

        let unknown = checker.report(&record);
        let mut keys: Vec<&str> = unknown.iter().map(|u| u.key.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["spellcasting_ability", "totally_new_field"]);

        let new_field = unknown.iter().find(|u| u.key == "totally_new_field").unwrap();
        assert_eq!(new_field.canonical, "TotallyNewField");
        assert_eq!(new_field.value, json!({"a": 1}));
    }

    #[test]
    fn test_pagination_key_is_configurable() {
        let (schema, normalizer) = fixture();
        let checker = SchemaConformanceChecker::new(&schema, &normalizer, "cursor");

        let record = object(json!({"name": "Rogue", "cursor": "abc", "page_no": 2}));
        let unknown = checker.check(&record);

        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].key, "page_no");
    }
}
