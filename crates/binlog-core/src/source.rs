//! Event source abstraction.
//!
//! The wire decoder lives outside this crate. It hands the engine a closed
//! set of decoded events through an [`EventCursor`], one bounded-wait call at
//! a time.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::types::{MutationKind, RowImage, StreamPosition};

/// Describes the table a following rows event refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMapEvent {
    pub table_id: u64,
    pub schema: String,
    pub table: String,
}

/// Before/after images of one changed row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowChange {
    pub before: Option<RowImage>,
    pub after: Option<RowImage>,
}

impl RowChange {
    pub fn inserted(after: RowImage) -> Self {
        Self {
            before: None,
            after: Some(after),
        }
    }

    pub fn updated(before: RowImage, after: RowImage) -> Self {
        Self {
            before: Some(before),
            after: Some(after),
        }
    }

    pub fn deleted(before: RowImage) -> Self {
        Self {
            before: Some(before),
            after: None,
        }
    }
}

/// A row mutation event; one event may carry many rows.
#[derive(Debug, Clone, PartialEq)]
pub struct RowsEvent {
    pub table_id: u64,
    pub kind: MutationKind,
    pub rows: Vec<RowChange>,
    pub timestamp: DateTime<Utc>,
}

/// A statement logged verbatim (DDL, transaction markers, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct QueryEvent {
    pub schema: String,
    pub sql: String,
    pub timestamp: DateTime<Utc>,
}

impl QueryEvent {
    /// `BEGIN` / `COMMIT` markers wrapping row-based transactions.
    pub fn is_transaction_marker(&self) -> bool {
        let sql = self.sql.trim();
        sql.eq_ignore_ascii_case("BEGIN") || sql.eq_ignore_ascii_case("COMMIT")
    }
}

/// Decoded binlog event, as far as the engine cares.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    TableMap(TableMapEvent),
    Rows(RowsEvent),
    Query(QueryEvent),
    /// Anything else (rotate, xid, heartbeat, format description, ...).
    Other,
}

/// Outcome of one bounded-wait retrieval.
#[derive(Debug, Clone, PartialEq)]
pub enum Poll {
    Event(Event),
    /// Nothing arrived within the wait bound.
    Idle,
}

/// Opens a cursor over the event stream.
#[async_trait]
pub trait EventSource: Send {
    type Cursor: EventCursor;

    /// Start streaming at `start`.
    async fn open(self, start: StreamPosition) -> Result<Self::Cursor>;
}

/// A live position in the event stream.
#[async_trait]
pub trait EventCursor: Send {
    /// Wait at most `timeout` for the next event.
    ///
    /// Returns `Poll::Idle` when nothing arrived in time; errors are fatal.
    async fn next(&mut self, timeout: Duration) -> Result<Poll>;

    /// Position immediately after the most recently returned event.
    fn next_position(&self) -> StreamPosition;
}
