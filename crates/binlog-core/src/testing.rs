//! In-memory collaborators for tests.
//!
//! `ScriptedSource` replays a fixed list of polls; once the script runs out
//! every further poll is idle. `StaticCatalog` answers column queries from a
//! fixed table list and counts how often it was asked.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::cache::SchemaCatalog;
use crate::source::{Event, EventCursor, EventSource, Poll};
use crate::types::{ColumnInfo, StreamPosition};

enum Step {
    Event(Event, StreamPosition),
    Idle,
    Fail(String),
}

/// Event source that replays a script.
#[derive(Default)]
pub struct ScriptedSource {
    steps: VecDeque<Step>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event`; `next` is the position right after it.
    pub fn event(mut self, event: Event, next: StreamPosition) -> Self {
        self.steps.push_back(Step::Event(event, next));
        self
    }

    pub fn idle(mut self) -> Self {
        self.steps.push_back(Step::Idle);
        self
    }

    pub fn fail(mut self, message: &str) -> Self {
        self.steps.push_back(Step::Fail(message.to_string()));
        self
    }
}

#[async_trait]
impl EventSource for ScriptedSource {
    type Cursor = ScriptedCursor;

    async fn open(self, start: StreamPosition) -> Result<Self::Cursor> {
        Ok(ScriptedCursor {
            steps: self.steps,
            position: start,
        })
    }
}

/// Cursor produced by [`ScriptedSource`].
pub struct ScriptedCursor {
    steps: VecDeque<Step>,
    position: StreamPosition,
}

#[async_trait]
impl EventCursor for ScriptedCursor {
    async fn next(&mut self, _timeout: Duration) -> Result<Poll> {
        match self.steps.pop_front() {
            Some(Step::Event(event, next)) => {
                self.position = next;
                Ok(Poll::Event(event))
            }
            Some(Step::Fail(message)) => Err(anyhow!(message)),
            Some(Step::Idle) | None => Ok(Poll::Idle),
        }
    }

    fn next_position(&self) -> StreamPosition {
        self.position.clone()
    }
}

/// Schema catalog backed by a fixed table list.
#[derive(Default)]
pub struct StaticCatalog {
    tables: HashMap<(String, String), Vec<ColumnInfo>>,
    calls: AtomicUsize,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, schema: &str, table: &str, columns: Vec<ColumnInfo>) -> Self {
        self.tables
            .insert((schema.to_string(), table.to_string()), columns);
        self
    }

    /// Number of column queries answered so far, failures included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SchemaCatalog for StaticCatalog {
    async fn columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnInfo>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.tables
            .get(&(schema.to_string(), table.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("Table '{schema}.{table}' not found"))
    }
}
