// error.rs — Internal error taxonomy.
//
// Everything in here stays inside the crate: the public MemoryEngine boundary
// converts these into the documented sentinel values (no-match distance,
// empty list, silent write drop) and a log record. Nothing crosses into the
// decision loop as an Err or a panic.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("storage path {0:?} is not usable")]
    StoragePath(PathBuf, #[source] std::io::Error),

    #[error("vector store error")]
    Store(#[from] lancedb::Error),

    #[error("arrow conversion error")]
    Arrow(#[from] arrow_schema::ArrowError),

    /// Embedding dimensionality is a schema constant; an existing table with
    /// a different vector width cannot be opened.
    #[error("table '{table}' has vector width {found}, expected {expected}")]
    DimensionMismatch {
        table: String,
        expected: usize,
        found: usize,
    },

    #[error("embedder '{model}' returned {found} dims, expected {expected}")]
    EmbeddingWidth {
        model: String,
        expected: usize,
        found: usize,
    },

    #[error("embedding dimensionality {0} is out of range")]
    InvalidDimension(usize),

    #[error("embedding failed")]
    Embedding(#[source] anyhow::Error),

    #[error("{0} timed out after {1:?}")]
    Timeout(&'static str, Duration),

    /// A required text field was absent or blank; the write is dropped.
    #[error("nothing to embed: {0} is missing")]
    MissingText(&'static str),
}
