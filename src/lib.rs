//! # Ingot - Schema-Conformant Paginated Ingestion
//!
//! Pulls paginated collections of JSON records from a read-only HTTP API,
//! checks every record against a declared schema, and appends the records
//! to SQLite tables. Nested values (lists and objects of any shape) are
//! stored as canonical JSON text.
//!
//! ## Modules
//!
//! - **schema**: declarative schemas, wire-name normalization, conformance checks
//! - **ingest**: page retrieval, record decoding, nested value encoding, the driver loop
//! - **store**: SQLite tables, per-page transactions and resume checkpoints
//! - **catalog**: built-in entity kinds (classes, monsters, races)
//!
//! ## Quick Start
//!
//! ```rust
//! use ingot::{catalog, IngestConfig, ReplayPageSource, SqliteWriter};
//!
//! # fn main() -> anyhow::Result<()> {
//! let kind = catalog::classes()?.with_initial_url("page-1");
//! let mut source = ReplayPageSource::new().with_page(
//!     "page-1",
//!     r#"{"count": 1, "next": null, "results": [{"name": "Fighter", "hit_dice": "1d10"}]}"#,
//! );
//! let mut writer = SqliteWriter::in_memory()?;
//!
//! let summary = ingot::ingest(&kind, &IngestConfig::default(), &mut source, &mut writer)?;
//! assert_eq!(summary.rows, 1);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod schema;
pub mod ingest;
pub mod store;
pub mod config;
pub mod catalog;
pub mod logging;

// Re-export commonly used types for convenience
pub use config::{DecodePolicy, EntityKind, EntityKindDef, IngestConfig};
pub use error::{ConfigError, IngestError};
pub use ingest::{
    HttpPageSource, IngestSummary, IngestionDriver, NestedValueEncoder, Page, PageSource,
    RecordDecoder, ReplayPageSource,
};
pub use schema::{Field, FieldKind, FieldNormalizer, NormalizationRules, Schema, SchemaConformanceChecker};
pub use store::SqliteWriter;

/// Main entry point: ingest every page of one entity kind
pub fn ingest<S: PageSource + ?Sized>(
    kind: &EntityKind,
    config: &IngestConfig,
    source: &mut S,
    writer: &mut SqliteWriter,
) -> error::Result<IngestSummary> {
    IngestionDriver::new(kind, config).run(source, writer)
}
