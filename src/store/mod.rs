//! Relational persistence
//!
//! Records land in SQLite as append-only rows. Scalar fields map to native
//! column types; nested fields are stored as encoded text.

pub mod writer;
pub mod checkpoint;

pub use writer::{declared_columns, SqliteWriter};
pub use checkpoint::Checkpoint;
