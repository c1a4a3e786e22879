use thiserror::Error;

use crate::index::DocId;

/// Main error type for blockdex operations
#[derive(Error, Debug)]
pub enum BlockdexError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read document {doc_id}: {source}")]
    DocumentRead {
        doc_id: DocId,
        #[source]
        source: std::io::Error,
    },

    #[error("Block {block} I/O error: {source}")]
    BlockIo {
        block: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Merge error on block {block}: {reason}")]
    Merge { block: String, reason: String },

    #[error("Document {doc_id} added out of order (previous document was {previous})")]
    OutOfOrderDocument { previous: DocId, doc_id: DocId },

    #[error("Malformed index file at line {line}: {reason}")]
    Dictionary { line: usize, reason: String },

    #[error("Query parse error: {0}")]
    QueryParse(String),

    #[error("Query error on line {line}: {message}")]
    Query { line: usize, message: String },

    #[error("Query on line {line} exceeded its deadline")]
    DeadlineExceeded { line: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for blockdex operations
pub type Result<T> = std::result::Result<T, BlockdexError>;

impl BlockdexError {
    /// Errors that only invalidate a single query line; the run continues.
    pub fn is_per_query(&self) -> bool {
        matches!(
            self,
            BlockdexError::QueryParse(_)
                | BlockdexError::Query { .. }
                | BlockdexError::DeadlineExceeded { .. }
        )
    }
}
