//! Stream position and window controller.
//!
//! Drives the retrieval loop: pull the next event with a bounded wait,
//! check the window, then dispatch to the metadata cache, the filter and the
//! translator. The loop is single-threaded and cooperative; the only
//! suspension point is the retrieval call.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use crate::cache::{SchemaCatalog, TableMetadataCache};
use crate::error::{EngineError, Result};
use crate::filter::EventFilter;
use crate::sink::StatementSink;
use crate::source::{Event, EventCursor, EventSource, Poll, QueryEvent, RowsEvent};
use crate::translate::{TranslateMode, Translator};
use crate::types::{GeneratedStatement, MutationEvent, StatementKind, StreamPosition};
use crate::window::{StopReason, WindowBounds};

/// Upper bound on a single wait for the next event.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Lifecycle of a controller. `Stopped` is terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerState {
    Running,
    Stopped(StopReason),
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Events retrieved and dispatched (idle polls excluded).
    pub events: u64,
    /// Statements handed to the sink.
    pub statements: u64,
    /// Rows dropped by the schema/table filter.
    pub filtered_rows: u64,
    /// Rows skipped because they precede the start time.
    pub skipped_rows: u64,
    /// Last position the controller dispatched up to.
    pub position: Option<StreamPosition>,
    pub stop_reason: Option<StopReason>,
}

/// Owns the window, the filter, the translator and the per-run metadata
/// cache.
#[derive(Debug)]
pub struct Controller {
    window: WindowBounds,
    filter: EventFilter,
    translator: Translator,
    cache: TableMetadataCache,
    state: ControllerState,
    poll_interval: Duration,
}

impl Controller {
    pub fn new(window: WindowBounds, filter: EventFilter, mode: TranslateMode) -> Self {
        Self {
            window,
            filter,
            translator: Translator::new(mode),
            cache: TableMetadataCache::new(),
            state: ControllerState::Running,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Override the retrieval wait bound.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn cache(&self) -> &TableMetadataCache {
        &self.cache
    }

    /// Open `source` at the configured start position and run until a stop
    /// condition or a fatal error.
    pub async fn run<Src, K, S>(
        &mut self,
        source: Src,
        catalog: &K,
        sink: &mut S,
    ) -> Result<RunSummary>
    where
        Src: EventSource,
        K: SchemaCatalog + ?Sized,
        S: StatementSink + ?Sized,
    {
        let start = self
            .window
            .start_position
            .clone()
            .ok_or(EngineError::MissingStartPosition)?;

        info!("Opening binlog stream at {}", start);
        let mut cursor = source
            .open(start.clone())
            .await
            .map_err(|source| EngineError::Open {
                position: start.to_string(),
                source,
            })?;

        let result = self.drive(&mut cursor, catalog, sink).await;
        let finished = sink.finish().await.map_err(EngineError::Sink);

        let summary = result?;
        finished?;
        Ok(summary)
    }

    /// Run the loop over an already opened cursor.
    pub async fn drive<C, K, S>(
        &mut self,
        cursor: &mut C,
        catalog: &K,
        sink: &mut S,
    ) -> Result<RunSummary>
    where
        C: EventCursor + ?Sized,
        K: SchemaCatalog + ?Sized,
        S: StatementSink + ?Sized,
    {
        let mut summary = RunSummary::default();

        let reason = loop {
            if let Some(reason) = self.window.time_exceeded(Utc::now()) {
                break reason;
            }

            let event = match cursor
                .next(self.poll_interval)
                .await
                .map_err(EngineError::Source)?
            {
                Poll::Event(event) => event,
                Poll::Idle => match self.window.idle_stop(Utc::now()) {
                    Some(reason) => break reason,
                    None => continue,
                },
            };

            let position = cursor.next_position();
            if self.window.past_end(&position) {
                break StopReason::EndPosition(position);
            }

            summary.events += 1;
            self.dispatch(event, &position, catalog, sink, &mut summary)
                .await?;
            summary.position = Some(position);
        };

        info!("Stopping: {}", reason);
        self.state = ControllerState::Stopped(reason.clone());
        summary.stop_reason = Some(reason);
        Ok(summary)
    }

    async fn dispatch<K, S>(
        &mut self,
        event: Event,
        position: &StreamPosition,
        catalog: &K,
        sink: &mut S,
        summary: &mut RunSummary,
    ) -> Result<()>
    where
        K: SchemaCatalog + ?Sized,
        S: StatementSink + ?Sized,
    {
        match event {
            Event::TableMap(map) => {
                self.cache
                    .refresh(catalog, map.table_id, &map.schema, &map.table)
                    .await?;
            }
            Event::Rows(rows) => self.dispatch_rows(rows, position, sink, summary).await?,
            Event::Query(query) => self.dispatch_query(query, position, sink, summary).await?,
            Event::Other => {}
        }
        Ok(())
    }

    async fn dispatch_rows<S>(
        &self,
        rows: RowsEvent,
        position: &StreamPosition,
        sink: &mut S,
        summary: &mut RunSummary,
    ) -> Result<()>
    where
        S: StatementSink + ?Sized,
    {
        let meta = self
            .cache
            .get(rows.table_id)
            .ok_or(EngineError::UnknownTable(rows.table_id))?;

        let row_count = rows.rows.len() as u64;
        if !self.filter.admits(&meta.schema, &meta.table) {
            summary.filtered_rows += row_count;
            return Ok(());
        }
        if self.window.before_start(rows.timestamp) {
            summary.skipped_rows += row_count;
            return Ok(());
        }

        debug!(
            "{} event on {}: {} row(s)",
            rows.kind,
            meta.qualified_name(),
            row_count
        );

        for change in rows.rows {
            let event = MutationEvent {
                kind: rows.kind,
                schema: meta.schema.clone(),
                table: meta.table.clone(),
                before: change.before,
                after: change.after,
                timestamp: rows.timestamp,
            };
            let statement = self
                .translator
                .translate(&event, meta)?
                .at(position.clone());
            sink.emit(&statement).await.map_err(EngineError::Sink)?;
            summary.statements += 1;
        }
        Ok(())
    }

    async fn dispatch_query<S>(
        &self,
        query: QueryEvent,
        position: &StreamPosition,
        sink: &mut S,
        summary: &mut RunSummary,
    ) -> Result<()>
    where
        S: StatementSink + ?Sized,
    {
        // Statements cannot be inverted; flashback output is row events only.
        if self.translator.mode() == TranslateMode::Flashback || query.is_transaction_marker() {
            return Ok(());
        }
        if !self.filter.admits_schema(&query.schema) {
            return Ok(());
        }

        let statement = GeneratedStatement::new(query.timestamp, query.sql, StatementKind::Other)
            .at(position.clone());
        sink.emit(&statement).await.map_err(EngineError::Sink)?;
        summary.statements += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterSpec;
    use crate::source::{RowChange, TableMapEvent};
    use crate::testing::{ScriptedSource, StaticCatalog};
    use crate::types::{ColumnInfo, MutationKind};
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone};

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn pos(offset: u32) -> StreamPosition {
        StreamPosition::new("mysql-bin.000001", offset)
    }

    fn catalog() -> StaticCatalog {
        StaticCatalog::new()
            .with_table(
                "db",
                "t",
                vec![
                    ColumnInfo::new("id", true),
                    ColumnInfo::new("name", false),
                    ColumnInfo::new("amount", false),
                ],
            )
            .with_table("other_db", "t", vec![ColumnInfo::new("id", true)])
    }

    fn table_map(table_id: u64, schema: &str) -> Event {
        Event::TableMap(TableMapEvent {
            table_id,
            schema: schema.to_string(),
            table: "t".to_string(),
        })
    }

    fn insert(table_id: u64, values: &[&str]) -> Event {
        Event::Rows(RowsEvent {
            table_id,
            kind: MutationKind::Insert,
            rows: vec![RowChange::inserted(row(values))],
            timestamp: ts(),
        })
    }

    fn window() -> WindowBounds {
        WindowBounds {
            start_position: Some(pos(4)),
            ..Default::default()
        }
    }

    fn controller(window: WindowBounds, mode: TranslateMode) -> Controller {
        Controller::new(window, EventFilter::default(), mode)
            .with_poll_interval(std::time::Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_translates_until_end_of_log() {
        let source = ScriptedSource::new()
            .event(table_map(1, "db"), pos(100))
            .event(insert(1, &["1", "bob", "10"]), pos(200))
            .idle();
        let mut sink: Vec<GeneratedStatement> = Vec::new();
        let mut controller = controller(window(), TranslateMode::Forward);

        let summary = controller
            .run(source, &catalog(), &mut sink)
            .await
            .unwrap();

        assert_eq!(sink.len(), 1);
        assert_eq!(
            sink[0].sql,
            "INSERT INTO db.t(`id`,`name`,`amount`) VALUES (1,'bob',10)"
        );
        assert_eq!(sink[0].position, Some(pos(200)));
        assert_eq!(summary.events, 2);
        assert_eq!(summary.statements, 1);
        assert_eq!(summary.position, Some(pos(200)));
        assert_eq!(summary.stop_reason, Some(StopReason::EndOfLog));
        assert_eq!(
            controller.state(),
            &ControllerState::Stopped(StopReason::EndOfLog)
        );
    }

    #[tokio::test]
    async fn test_missing_start_position_is_fatal() {
        let mut sink: Vec<GeneratedStatement> = Vec::new();
        let mut controller = controller(WindowBounds::default(), TranslateMode::Forward);

        let err = controller
            .run(ScriptedSource::new(), &catalog(), &mut sink)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingStartPosition));
    }

    #[tokio::test]
    async fn test_end_position_stops_before_dispatch() {
        let source = ScriptedSource::new()
            .event(table_map(1, "db"), pos(100))
            .event(insert(1, &["1", "bob", "10"]), pos(200))
            .event(insert(1, &["2", "amy", "30"]), pos(300));
        let window = WindowBounds {
            end_position: Some(pos(250)),
            ..window()
        };
        let mut sink: Vec<GeneratedStatement> = Vec::new();

        let summary = controller(window, TranslateMode::Forward)
            .run(source, &catalog(), &mut sink)
            .await
            .unwrap();

        assert_eq!(sink.len(), 1);
        assert!(sink[0].sql.contains("VALUES (1,'bob',10)"));
        assert_eq!(summary.stop_reason, Some(StopReason::EndPosition(pos(300))));
        assert_eq!(summary.position, Some(pos(200)));
    }

    #[tokio::test]
    async fn test_end_position_applies_to_every_event_kind() {
        let source = ScriptedSource::new()
            .event(Event::Other, pos(100))
            .event(table_map(1, "db"), pos(200));
        let window = WindowBounds {
            end_position: Some(pos(150)),
            ..window()
        };
        let catalog = catalog();
        let mut sink: Vec<GeneratedStatement> = Vec::new();
        let mut controller = controller(window, TranslateMode::Forward);

        controller.run(source, &catalog, &mut sink).await.unwrap();

        assert_eq!(catalog.calls(), 0);
        assert!(controller.cache().is_empty());
    }

    #[tokio::test]
    async fn test_idle_with_stop_never_keeps_polling_until_error() {
        let source = ScriptedSource::new()
            .idle()
            .idle()
            .fail("connection reset");
        let window = WindowBounds {
            stop_never: true,
            ..window()
        };
        let mut sink: Vec<GeneratedStatement> = Vec::new();

        let err = controller(window, TranslateMode::Forward)
            .run(source, &catalog(), &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Source(_)));
    }

    #[tokio::test]
    async fn test_past_stop_time_stops_immediately() {
        let stop = Utc::now() - ChronoDuration::hours(1);
        let source = ScriptedSource::new()
            .event(table_map(1, "db"), pos(100))
            .event(insert(1, &["1", "bob", "10"]), pos(200));
        let window = WindowBounds {
            stop_time: Some(stop),
            stop_never: true,
            ..window()
        };
        let mut sink: Vec<GeneratedStatement> = Vec::new();

        let summary = controller(window, TranslateMode::Forward)
            .run(source, &catalog(), &mut sink)
            .await
            .unwrap();

        assert!(sink.is_empty());
        assert_eq!(summary.stop_reason, Some(StopReason::StopTime(stop)));
    }

    #[tokio::test]
    async fn test_filter_drops_other_schema() {
        let source = ScriptedSource::new()
            .event(table_map(1, "db"), pos(100))
            .event(table_map(2, "other_db"), pos(150))
            .event(insert(2, &["9"]), pos(200))
            .event(insert(1, &["1", "bob", "10"]), pos(300))
            .idle();
        let filter = EventFilter::new(FilterSpec::new(Some("db".into()), Vec::<String>::new()));
        let mut sink: Vec<GeneratedStatement> = Vec::new();

        let summary = Controller::new(window(), filter, TranslateMode::Forward)
            .with_poll_interval(std::time::Duration::from_millis(1))
            .run(source, &catalog(), &mut sink)
            .await
            .unwrap();

        assert_eq!(sink.len(), 1);
        assert!(sink[0].sql.starts_with("INSERT INTO db.t"));
        assert_eq!(summary.filtered_rows, 1);
    }

    #[tokio::test]
    async fn test_rows_before_start_time_are_skipped() {
        let source = ScriptedSource::new()
            .event(table_map(1, "db"), pos(100))
            .event(insert(1, &["1", "bob", "10"]), pos(200))
            .idle();
        let window = WindowBounds {
            start_time: Some(ts() + ChronoDuration::seconds(1)),
            ..window()
        };
        let mut sink: Vec<GeneratedStatement> = Vec::new();

        let summary = controller(window, TranslateMode::Forward)
            .run(source, &catalog(), &mut sink)
            .await
            .unwrap();

        assert!(sink.is_empty());
        assert_eq!(summary.skipped_rows, 1);
        assert_eq!(summary.stop_reason, Some(StopReason::EndOfLog));
    }

    #[tokio::test]
    async fn test_rows_without_table_map_are_fatal() {
        let source = ScriptedSource::new().event(insert(7, &["1"]), pos(100));
        let mut sink: Vec<GeneratedStatement> = Vec::new();

        let err = controller(window(), TranslateMode::Forward)
            .run(source, &catalog(), &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::UnknownTable(7)));
    }

    #[tokio::test]
    async fn test_catalog_failure_aborts_run() {
        let source = ScriptedSource::new()
            .event(
                Event::TableMap(TableMapEvent {
                    table_id: 3,
                    schema: "db".into(),
                    table: "gone".into(),
                }),
                pos(100),
            )
            .idle();
        let mut sink: Vec<GeneratedStatement> = Vec::new();

        let err = controller(window(), TranslateMode::Forward)
            .run(source, &catalog(), &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Catalog { .. }));
    }

    #[tokio::test]
    async fn test_query_events_forward_only() {
        let query = |sql: &str| {
            Event::Query(QueryEvent {
                schema: "db".into(),
                sql: sql.into(),
                timestamp: ts(),
            })
        };
        let script = || {
            ScriptedSource::new()
                .event(query("BEGIN"), pos(100))
                .event(query("ALTER TABLE t ADD COLUMN note TEXT"), pos(200))
                .event(query("COMMIT"), pos(300))
                .idle()
        };

        let mut forward: Vec<GeneratedStatement> = Vec::new();
        controller(window(), TranslateMode::Forward)
            .run(script(), &catalog(), &mut forward)
            .await
            .unwrap();
        assert_eq!(forward.len(), 1);
        assert_eq!(forward[0].kind, StatementKind::Other);
        assert_eq!(forward[0].sql, "ALTER TABLE t ADD COLUMN note TEXT");

        let mut flashback: Vec<GeneratedStatement> = Vec::new();
        controller(window(), TranslateMode::Flashback)
            .run(script(), &catalog(), &mut flashback)
            .await
            .unwrap();
        assert!(flashback.is_empty());
    }

    #[tokio::test]
    async fn test_flashback_multi_row_event() {
        let source = ScriptedSource::new()
            .event(table_map(1, "db"), pos(100))
            .event(
                Event::Rows(RowsEvent {
                    table_id: 1,
                    kind: MutationKind::Delete,
                    rows: vec![
                        RowChange::deleted(row(&["1", "bob", "10"])),
                        RowChange::deleted(row(&["2", "amy", "12.5"])),
                    ],
                    timestamp: ts(),
                }),
                pos(200),
            )
            .idle();
        let mut sink: Vec<GeneratedStatement> = Vec::new();

        controller(window(), TranslateMode::Flashback)
            .run(source, &catalog(), &mut sink)
            .await
            .unwrap();

        let sql: Vec<&str> = sink.iter().map(|s| s.sql.as_str()).collect();
        assert_eq!(
            sql,
            vec![
                "INSERT INTO db.t(`id`,`name`,`amount`) VALUES (1,'bob',10)",
                "INSERT INTO db.t(`id`,`name`,`amount`) VALUES (2,'amy','12.5')",
            ]
        );
        assert!(sink.iter().all(|s| s.kind == StatementKind::Insert));
    }
}
