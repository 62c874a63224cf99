//! Wire identifier normalization
//!
//! Upstream payloads use snake_case keys (`hit_dice`, `document__slug`). The
//! generic rule title-cases every `_`-separated segment and joins them
//! (`HitDice`, `DocumentSlug`). Abbreviated or irregular keys such as
//! `hp_at_1st_level` cannot be reconstructed that way, so each entity kind
//! carries an explicit rename list that is consulted after transliteration.

use crate::error::ConfigError;
use crate::schema::field::{canonical_form, Schema};
use std::collections::HashMap;

/// Separator between words in wire identifiers
pub const WIRE_SEPARATOR: char = '_';

/// Explicit wire-to-canonical renames for one entity kind
#[derive(Debug, Clone, Default)]
pub struct NormalizationRules {
    renames: Vec<(String, String)>,
}

impl NormalizationRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a wire identifier (e.g. `hp_at_1st_level`) to a canonical one
    pub fn rename(mut self, wire: impl Into<String>, canonical: impl AsRef<str>) -> Self {
        self.renames.push((wire.into(), canonical_form(canonical.as_ref())));
        self
    }

    pub fn renames(&self) -> &[(String, String)] {
        &self.renames
    }

    pub fn is_empty(&self) -> bool {
        self.renames.is_empty()
    }

    /// Every rename must land on a field of the schema
    pub fn validate(&self, schema: &Schema) -> Result<(), ConfigError> {
        for (wire, target) in &self.renames {
            if !schema.contains(target) {
                return Err(ConfigError::UnknownRenameTarget {
                    wire: wire.clone(),
                    target: target.clone(),
                });
            }
        }
        Ok(())
    }
}

impl<W: Into<String>, C: AsRef<str>> FromIterator<(W, C)> for NormalizationRules {
    fn from_iter<I: IntoIterator<Item = (W, C)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(NormalizationRules::new(), |rules, (wire, canonical)| rules.rename(wire, canonical))
    }
}

/// How a wire identifier reached its canonical form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub canonical: String,
    /// True when an explicit rename produced the result
    pub renamed: bool,
}

/// Maps wire identifiers to canonical identifiers
#[derive(Debug, Clone, Default)]
pub struct FieldNormalizer {
    // keyed by the transliterated form so every spelling that transliterates
    // the same way gets the same override
    overrides: HashMap<String, String>,
}

impl FieldNormalizer {
    pub fn new(rules: &NormalizationRules) -> Self {
        let overrides = rules
            .renames()
            .iter()
            .map(|(wire, canonical)| (transliterate(wire), canonical.clone()))
            .collect();
        FieldNormalizer { overrides }
    }

    /// Canonical identifier for a wire identifier. Never fails; whether the
    /// result is a known field is for the caller to decide.
    pub fn normalize(&self, wire: &str) -> String {
        self.resolve(wire).canonical
    }

    pub fn resolve(&self, wire: &str) -> Resolution {
        let generic = transliterate(wire);
        match self.overrides.get(&generic) {
            Some(canonical) => Resolution {
                canonical: canonical.clone(),
                renamed: true,
            },
            None => Resolution {
                canonical: generic,
                renamed: false,
            },
        }
    }
}

/// Generic rule: title-case each segment and concatenate.
/// Only the first character of a segment changes, so `1st` stays `1st`.
pub fn transliterate(wire: &str) -> String {
    wire.split(WIRE_SEPARATOR).map(canonical_form).collect()
}
