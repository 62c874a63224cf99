//! Entity schemas and wire-name handling
//!
//! This module holds the declarative side of ingestion: which fields an
//! entity kind has, how upstream keys map onto them, and which upstream keys
//! have no home in the schema.

pub mod field;
pub mod normalize;
pub mod conformance;

pub use field::{column_name, Field, FieldKind, Schema};
pub use normalize::{transliterate, FieldNormalizer, NormalizationRules, Resolution};
pub use conformance::{SchemaConformanceChecker, UnknownField, DEFAULT_PAGINATION_KEY};
