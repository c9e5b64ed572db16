//! Error types for the reconstruction engine.

use thiserror::Error;

use crate::types::MutationKind;

/// Errors that abort a run.
///
/// Nothing here is retried: the first error ends the run and is handed back
/// to the caller.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Missing start position: a start file is required to open the binlog stream")]
    MissingStartPosition,

    #[error("Failed to open event stream at {position}")]
    Open {
        position: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Event source error")]
    Source(#[source] anyhow::Error),

    #[error("Schema catalog query failed for table '{schema}.{table}'")]
    Catalog {
        schema: String,
        table: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Table '{schema}.{table}' has no columns in the schema catalog")]
    EmptyTable { schema: String, table: String },

    #[error("Row event references table id {0} with no preceding table map event")]
    UnknownTable(u64),

    #[error("{kind} event for '{schema}.{table}' is missing its {image} image")]
    MissingRowImage {
        kind: MutationKind,
        schema: String,
        table: String,
        image: &'static str,
    },

    #[error(
        "Row image for '{schema}.{table}' has {values} values but only {columns} columns are known"
    )]
    ColumnCountMismatch {
        schema: String,
        table: String,
        columns: usize,
        values: usize,
    },

    #[error("Empty predicate generated for table '{schema}.{table}'")]
    EmptyPredicate { schema: String, table: String },

    #[error("Statement sink error")]
    Sink(#[source] anyhow::Error),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
