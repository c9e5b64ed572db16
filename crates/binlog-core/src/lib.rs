//! Core event reconstruction engine for binlogsql.
//!
//! This crate turns decoded row-level change events from a MySQL binary log
//! into SQL text, either forward (what happened) or flashback (the logical
//! inverse). It owns no I/O: the event stream, the schema catalog and the
//! output sink are collaborators described by traits, with MySQL-backed
//! implementations living in `binlogsql-mysql-source`.
//!
//! # Architecture
//!
//! ```text
//! EventCursor ──► Controller ──► TableMetadataCache ◄── SchemaCatalog
//!                    │
//!                    ├──► EventFilter
//!                    │
//!                    └──► Translator ──► predicate ──► StatementSink
//! ```
//!
//! - [`Controller`] - drives the retrieval loop and owns the window bounds
//! - [`TableMetadataCache`] - column layout and primary key per table id
//! - [`predicate`] - `` `col`=value `` clause building
//! - [`Translator`] - one mutation event to one statement
//! - [`EventFilter`] - schema / table allow-list gate
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashSet;
//! use binlog_core::{MutationEvent, TableMetadata, TranslateMode, Translator};
//!
//! let meta = TableMetadata::new(
//!     "db",
//!     "t",
//!     vec!["id".into(), "name".into()],
//!     HashSet::from(["id".to_string()]),
//! );
//! let event = MutationEvent::insert("db", "t", vec!["1".into(), "bob".into()], chrono::Utc::now());
//!
//! let stmt = Translator::new(TranslateMode::Flashback).translate(&event, &meta).unwrap();
//! assert_eq!(stmt.sql, "DELETE FROM db.t WHERE `id`=1 LIMIT 1");
//! ```

pub mod cache;
pub mod controller;
pub mod error;
pub mod filter;
pub mod predicate;
pub mod sink;
pub mod source;
pub mod translate;
pub mod types;
pub mod window;

// Make in-memory collaborators available for integration tests
#[doc(hidden)]
pub mod testing;

pub use cache::{SchemaCatalog, TableMetadataCache};
pub use controller::{Controller, ControllerState, RunSummary, POLL_INTERVAL};
pub use error::{EngineError, Result};
pub use filter::{EventFilter, FilterSpec};
pub use predicate::{render_value, Clause};
pub use sink::StatementSink;
pub use source::{
    Event, EventCursor, EventSource, Poll, QueryEvent, RowChange, RowsEvent, TableMapEvent,
};
pub use translate::{TranslateMode, Translator};
pub use types::{
    ColumnInfo, GeneratedStatement, MutationEvent, MutationKind, RowImage, StatementKind,
    StreamPosition, TableMetadata,
};
pub use window::{StopReason, WindowBounds};
