//! Paginated ingestion
//!
//! This module turns upstream pages into stored rows: page retrieval,
//! record decoding, nested value encoding and the driver loop that ties
//! them together.

pub mod types;
pub mod decoder;
pub mod encoder;
pub mod fetcher;
pub mod driver;

pub use types::{Cell, Cursor, FieldValue, Page, RawRecord, Record, Row};
pub use decoder::RecordDecoder;
pub use encoder::NestedValueEncoder;
pub use fetcher::{HttpPageSource, PageSource, ReplayPageSource};
pub use driver::{IngestSummary, IngestionDriver, PageOutcome, SkippedRecord};
