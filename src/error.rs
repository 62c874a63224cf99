use std::io;

use thiserror::Error;

/// Fatal failures of an ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to fetch '{url}': {reason}")]
    Transport { url: String, reason: String },
    #[error("'{url}' responded with status {status}: {body}")]
    Status { url: String, status: u16, body: String },
    #[error("malformed page: {0}")]
    MalformedPage(String),
    #[error("could not decode record {index}, field '{field}': {reason}")]
    Decode {
        index: usize,
        field: String,
        reason: String,
    },
    #[error("could not encode nested field '{field}': {source}")]
    Encode {
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("stored nested value is not valid JSON: {0}")]
    CorruptNestedValue(#[source] serde_json::Error),
    #[error(transparent)]
    Persistence(#[from] rusqlite::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Problems found while assembling an entity kind from static configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("field '{0}' is declared more than once")]
    DuplicateField(String),
    #[error("column '{0}' is used by more than one field")]
    DuplicateColumn(String),
    #[error("'{0}' is not a valid identifier")]
    InvalidIdentifier(String),
    #[error("rename of '{wire}' targets '{target}', which is not a schema field")]
    UnknownRenameTarget { wire: String, target: String },
    #[error("unknown entity kind '{0}'")]
    UnknownKind(String),
    #[error("unknown field kind '{0}' (expected text, integer, float or nested)")]
    UnknownFieldKind(String),
    #[error("invalid entity kind definition: {0}")]
    Definition(String),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
