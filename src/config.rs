use crate::error::{ConfigError, IngestError, Result};
use crate::schema::{Field, FieldKind, FieldNormalizer, NormalizationRules, Schema, DEFAULT_PAGINATION_KEY};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

static TABLE_IDENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("table identifier pattern is valid")
});

/// What to do with a record whose scalar fields cannot be coerced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePolicy {
    /// Stop the whole run
    #[default]
    Abort,
    /// Log the record and carry on with the rest of the page
    SkipRecord,
}

/// Configuration for an ingestion run
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Record key that carries pagination metadata rather than entity data
    pub pagination_key: String,

    /// Handling of records that fail to decode
    pub on_decode_error: DecodePolicy,

    /// Continue from the stored checkpoint instead of the initial URL
    pub resume: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            pagination_key: String::from(DEFAULT_PAGINATION_KEY),
            on_decode_error: DecodePolicy::Abort,
            resume: false,
        }
    }
}

/// Everything needed to ingest one kind of entity
#[derive(Debug, Clone)]
pub struct EntityKind {
    name: String,
    schema: Schema,
    rules: NormalizationRules,
    normalizer: FieldNormalizer,
    initial_url: String,
    table: String,
}

impl EntityKind {
    /// Assemble and validate an entity kind
    pub fn new(
        name: impl Into<String>,
        schema: Schema,
        rules: NormalizationRules,
        initial_url: impl Into<String>,
        table: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let table = table.into();
        if !TABLE_IDENT_REGEX.is_match(&table) {
            return Err(ConfigError::InvalidIdentifier(table));
        }
        rules.validate(&schema)?;

        let normalizer = FieldNormalizer::new(&rules);
        Ok(EntityKind {
            name: name.into(),
            schema,
            rules,
            normalizer,
            initial_url: initial_url.into(),
            table,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rules(&self) -> &NormalizationRules {
        &self.rules
    }

    pub fn normalizer(&self) -> &FieldNormalizer {
        &self.normalizer
    }

    pub fn initial_url(&self) -> &str {
        &self.initial_url
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Same kind, different starting URL
    pub fn with_initial_url(mut self, url: impl Into<String>) -> Self {
        self.initial_url = url.into();
        self
    }

    /// Load a kind from a JSON definition file
    pub fn from_definition_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(&path)?;
        let def: EntityKindDef = serde_json::from_str(&text)
            .map_err(|e| IngestError::Config(ConfigError::Definition(e.to_string())))?;
        Ok(def.into_kind()?)
    }
}

/// Serialized form of an entity kind
///
/// ```json
/// {
///   "name": "classes",
///   "url": "https://api.open5e.com/v1/classes/",
///   "table": "class_imports",
///   "fields": [
///     {"name": "Name", "kind": "text"},
///     {"name": "HpAtFirstLevel", "kind": "text"},
///     {"name": "Archetypes", "kind": "nested"}
///   ],
///   "renames": {"hp_at_1st_level": "HpAtFirstLevel"}
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct EntityKindDef {
    pub name: String,
    pub url: String,
    pub table: String,
    pub fields: Vec<FieldDef>,
    #[serde(default)]
    pub renames: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub column: Option<String>,
}

impl EntityKindDef {
    pub fn into_kind(self) -> Result<EntityKind, ConfigError> {
        let fields = self
            .fields
            .into_iter()
            .map(|def| {
                let field = Field::new(&def.name, def.kind);
                match def.column {
                    Some(column) => field.with_column(column),
                    None => field,
                }
            })
            .collect();
        let schema = Schema::new(fields)?;
        let rules: NormalizationRules = self.renames.into_iter().collect();

        EntityKind::new(self.name, schema, rules, self.url, self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = IngestConfig::default();
        assert_eq!(config.pagination_key, "page_no");
        assert_eq!(config.on_decode_error, DecodePolicy::Abort);
        assert!(!config.resume);
    }

    #[test]
    fn test_definition_builds_kind() {
        let def: EntityKindDef = serde_json::from_value(json!({
            "name": "classes",
            "url": "https://example.test/v1/classes/",
            "table": "class_imports",
            "fields": [
                {"name": "name", "kind": "text"},
                {"name": "HpAtFirstLevel", "kind": "text"},
                {"name": "Table", "kind": "text", "column": "class_table"},
                {"name": "Archetypes", "kind": "nested"}
            ],
            "renames": {"hp_at_1st_level": "HpAtFirstLevel"}
        }))
        .unwrap();

        let kind = def.into_kind().unwrap();
        assert_eq!(kind.table(), "class_imports");
        assert_eq!(kind.schema().len(), 4);
        assert!(kind.schema().contains("Name"));
        assert_eq!(kind.schema().get("Table").unwrap().column(), "class_table");
        assert_eq!(kind.normalizer().normalize("hp_at_1st_level"), "HpAtFirstLevel");
    }

    #[test]
    fn test_rename_to_missing_field_is_rejected() {
        let def: EntityKindDef = serde_json::from_value(json!({
            "name": "races",
            "url": "https://example.test/v1/races/",
            "table": "race_imports",
            "fields": [{"name": "Name", "kind": "text"}],
            "renames": {"speed_desc": "SpeedDescription"}
        }))
        .unwrap();

        assert!(matches!(def.into_kind(), Err(ConfigError::UnknownRenameTarget { .. })));
    }

    #[test]
    fn test_bad_table_name_is_rejected() {
        let schema = Schema::new(vec![Field::text("Name")]).unwrap();
        let result = EntityKind::new("x", schema, NormalizationRules::new(), "u", "drop table;");
        assert!(matches!(result, Err(ConfigError::InvalidIdentifier(_))));
    }

    #[test]
    fn test_definition_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spells.json");
        std::fs::write(
            &path,
            r#"{"name": "spells", "url": "https://example.test/v1/spells/", "table": "spell_imports",
                "fields": [{"name": "Name", "kind": "text"}, {"name": "Level", "kind": "integer"}]}"#,
        )
        .unwrap();

        let kind = EntityKind::from_definition_file(&path).unwrap();
        assert_eq!(kind.name(), "spells");
        assert!(kind.rules().is_empty());

        std::fs::write(&path, "{").unwrap();
        assert!(matches!(
            EntityKind::from_definition_file(&path),
            Err(IngestError::Config(ConfigError::Definition(_)))
        ));
    }
}
