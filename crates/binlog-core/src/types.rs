//! Data model shared by every part of the engine.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};

/// A position in the binary log: file name plus byte offset.
///
/// Ordering compares `file` lexicographically first, then `offset`. This is a
/// total order only while log files share a fixed-width numeric suffix
/// (`mysql-bin.000009` < `mysql-bin.000010`), which is MySQL's own naming
/// convention.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamPosition {
    pub file: String,
    pub offset: u32,
}

impl StreamPosition {
    pub fn new(file: impl Into<String>, offset: u32) -> Self {
        Self {
            file: file.into(),
            offset,
        }
    }
}

impl fmt::Display for StreamPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.offset)
    }
}

/// Column values of one row, as text, aligned to column ordinal.
///
/// May be shorter than the table's column list when the server logs minimal
/// row images.
pub type RowImage = Vec<String>;

/// One column as reported by the schema catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub is_primary_key: bool,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, is_primary_key: bool) -> Self {
        Self {
            name: name.into(),
            is_primary_key,
        }
    }
}

/// Column layout and primary key membership of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMetadata {
    pub schema: String,
    pub table: String,
    /// Column names; index is the wire ordinal.
    pub columns: Vec<String>,
    pub primary_key: HashSet<String>,
}

impl TableMetadata {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        columns: Vec<String>,
        primary_key: HashSet<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            columns,
            primary_key,
        }
    }

    /// Build metadata from catalog output, keeping catalog order.
    pub fn from_columns(
        schema: impl Into<String>,
        table: impl Into<String>,
        columns: Vec<ColumnInfo>,
    ) -> Self {
        let primary_key = columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.clone())
            .collect();
        let columns = columns.into_iter().map(|c| c.name).collect();
        Self::new(schema, table, columns, primary_key)
    }

    /// `schema.table`, as written into generated statements.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }
}

/// Kind of row mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::Insert => write!(f, "INSERT"),
            MutationKind::Update => write!(f, "UPDATE"),
            MutationKind::Delete => write!(f, "DELETE"),
        }
    }
}

/// A single-row mutation, resolved to its schema and table.
///
/// INSERT carries only `after`, DELETE only `before`, UPDATE both.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationEvent {
    pub kind: MutationKind,
    pub schema: String,
    pub table: String,
    pub before: Option<RowImage>,
    pub after: Option<RowImage>,
    pub timestamp: DateTime<Utc>,
}

impl MutationEvent {
    pub fn insert(
        schema: impl Into<String>,
        table: impl Into<String>,
        after: RowImage,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: MutationKind::Insert,
            schema: schema.into(),
            table: table.into(),
            before: None,
            after: Some(after),
            timestamp,
        }
    }

    pub fn update(
        schema: impl Into<String>,
        table: impl Into<String>,
        before: RowImage,
        after: RowImage,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: MutationKind::Update,
            schema: schema.into(),
            table: table.into(),
            before: Some(before),
            after: Some(after),
            timestamp,
        }
    }

    pub fn delete(
        schema: impl Into<String>,
        table: impl Into<String>,
        before: RowImage,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: MutationKind::Delete,
            schema: schema.into(),
            table: table.into(),
            before: Some(before),
            after: None,
            timestamp,
        }
    }
}

/// Kind of a generated statement, used by sinks for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Insert,
    Update,
    Delete,
    Other,
}

impl From<MutationKind> for StatementKind {
    fn from(kind: MutationKind) -> Self {
        match kind {
            MutationKind::Insert => StatementKind::Insert,
            MutationKind::Update => StatementKind::Update,
            MutationKind::Delete => StatementKind::Delete,
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::Insert => write!(f, "INSERT"),
            StatementKind::Update => write!(f, "UPDATE"),
            StatementKind::Delete => write!(f, "DELETE"),
            StatementKind::Other => write!(f, "OTHER"),
        }
    }
}

/// One statement handed to the output sink.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedStatement {
    /// Time the originating event was written to the log.
    pub timestamp: DateTime<Utc>,
    /// SQL text, without a trailing `;`.
    pub sql: String,
    pub kind: StatementKind,
    /// Position right after the originating event, once known.
    pub position: Option<StreamPosition>,
}

impl GeneratedStatement {
    pub fn new(timestamp: DateTime<Utc>, sql: String, kind: StatementKind) -> Self {
        Self {
            timestamp,
            sql,
            kind,
            position: None,
        }
    }

    pub fn at(mut self, position: StreamPosition) -> Self {
        self.position = Some(position);
        self
    }
}
