//! Binlog replication cursor
//!
//! Registers as a replica with a random server id and decodes the event
//! stream into engine events. Positions follow the `log_pos` carried in
//! every event header; rotate events switch the file.

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use binlog_core::{
    Event, EventCursor, EventSource, MutationKind, Poll, QueryEvent, RowChange, RowsEvent,
    StreamPosition, TableMapEvent,
};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use mysql_async::binlog::events::{EventData, RowsEventData};
use mysql_async::{BinlogStream, BinlogStreamRequest, Conn, Opts};
use tracing::{debug, info};

use crate::client::replication_opts;
use crate::value::row_image;
use crate::SourceOpts;

/// Binlog source that opens a fresh replication connection.
pub struct MySQLBinlogSource {
    opts: Opts,
    server_id: u32,
}

impl MySQLBinlogSource {
    pub fn new(opts: &SourceOpts) -> Self {
        // Random id in 1000000..2000000 so several readers can coexist
        let server_id = rand::random::<u32>() % 1_000_000 + 1_000_000;
        Self::with_server_id(opts, server_id)
    }

    pub fn with_server_id(opts: &SourceOpts, server_id: u32) -> Self {
        Self {
            opts: replication_opts(opts),
            server_id,
        }
    }

    pub fn server_id(&self) -> u32 {
        self.server_id
    }
}

#[async_trait]
impl EventSource for MySQLBinlogSource {
    type Cursor = MySQLBinlogCursor;

    async fn open(self, start: StreamPosition) -> Result<Self::Cursor> {
        let conn = Conn::new(self.opts.clone())
            .await
            .context("Failed to open replication connection")?;

        let request = BinlogStreamRequest::new(self.server_id)
            .with_filename(start.file.as_bytes())
            .with_pos(u64::from(start.offset));
        let stream = conn
            .get_binlog_stream(request)
            .await
            .context("Failed to request binlog stream")?;

        info!(
            "Streaming binlog from {} as replica server_id {}",
            start, self.server_id
        );
        Ok(MySQLBinlogCursor {
            stream,
            position: PositionTracker::new(start),
        })
    }
}

/// Live binlog stream plus the position after the last event read.
pub struct MySQLBinlogCursor {
    stream: BinlogStream,
    position: PositionTracker,
}

#[async_trait]
impl EventCursor for MySQLBinlogCursor {
    async fn next(&mut self, timeout: Duration) -> Result<Poll> {
        let event = match tokio::time::timeout(timeout, self.stream.next()).await {
            Err(_) => return Ok(Poll::Idle),
            Ok(None) => bail!("Binlog stream closed by server"),
            Ok(Some(event)) => event.context("Failed to read binlog event")?,
        };

        let header = event.header();
        let timestamp =
            DateTime::<Utc>::from_timestamp(i64::from(header.timestamp()), 0).unwrap_or_default();
        let log_pos = header.log_pos();

        let data = event
            .read_data()
            .context("Failed to decode binlog event")?;

        let decoded = match data {
            Some(EventData::RotateEvent(rotate)) => {
                self.position.rotate(&rotate.name(), rotate.position());
                debug!("Rotated to {}", self.position.current());
                return Ok(Poll::Event(Event::Other));
            }
            Some(EventData::TableMapEvent(tme)) => Event::TableMap(TableMapEvent {
                table_id: tme.table_id(),
                schema: tme.database_name().into_owned(),
                table: tme.table_name().into_owned(),
            }),
            Some(EventData::RowsEvent(rows_event)) => {
                let table_id = rows_event.table_id();
                let tme = self
                    .stream
                    .get_tme(table_id)
                    .ok_or_else(|| anyhow!("No table map received for table id {table_id}"))?;

                let mut rows = Vec::new();
                for row in rows_event.rows(tme) {
                    let (before, after) = row.context("Failed to decode row image")?;
                    rows.push(RowChange {
                        before: before.as_ref().map(row_image).transpose()?,
                        after: after.as_ref().map(row_image).transpose()?,
                    });
                }

                Event::Rows(RowsEvent {
                    table_id,
                    kind: mutation_kind(&rows_event),
                    rows,
                    timestamp,
                })
            }
            Some(EventData::QueryEvent(query)) => Event::Query(QueryEvent {
                schema: query.schema().into_owned(),
                sql: query.query().into_owned(),
                timestamp,
            }),
            _ => Event::Other,
        };

        self.position.advance(log_pos);
        Ok(Poll::Event(decoded))
    }

    fn next_position(&self) -> StreamPosition {
        self.position.current()
    }
}

fn mutation_kind(rows_event: &RowsEventData<'_>) -> MutationKind {
    match rows_event {
        RowsEventData::WriteRowsEventV1(_) | RowsEventData::WriteRowsEvent(_) => {
            MutationKind::Insert
        }
        RowsEventData::UpdateRowsEventV1(_)
        | RowsEventData::UpdateRowsEvent(_)
        | RowsEventData::PartialUpdateRowsEvent(_) => MutationKind::Update,
        RowsEventData::DeleteRowsEventV1(_) | RowsEventData::DeleteRowsEvent(_) => {
            MutationKind::Delete
        }
    }
}

/// File and offset right after the last event seen.
#[derive(Debug, Clone)]
struct PositionTracker {
    file: String,
    offset: u32,
}

impl PositionTracker {
    fn new(start: StreamPosition) -> Self {
        Self {
            file: start.file,
            offset: start.offset,
        }
    }

    /// Artificial events carry `log_pos == 0` and leave the offset alone.
    fn advance(&mut self, log_pos: u32) {
        if log_pos != 0 {
            self.offset = log_pos;
        }
    }

    fn rotate(&mut self, file: &str, position: u64) {
        self.file = file.to_string();
        self.offset = u32::try_from(position).unwrap_or(u32::MAX);
    }

    fn current(&self) -> StreamPosition {
        StreamPosition::new(self.file.clone(), self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_follows_log_pos() {
        let mut tracker = PositionTracker::new(StreamPosition::new("mysql-bin.000001", 4));
        tracker.advance(126);
        tracker.advance(0);
        assert_eq!(tracker.current(), StreamPosition::new("mysql-bin.000001", 126));
    }

    #[test]
    fn test_rotate_switches_file() {
        let mut tracker = PositionTracker::new(StreamPosition::new("mysql-bin.000001", 900));
        tracker.rotate("mysql-bin.000002", 4);
        assert_eq!(tracker.current(), StreamPosition::new("mysql-bin.000002", 4));
    }

    #[test]
    fn test_random_server_id_range() {
        let opts = SourceOpts {
            host: "127.0.0.1".into(),
            port: 3306,
            user: "root".into(),
            password: String::new(),
        };
        for _ in 0..32 {
            let id = MySQLBinlogSource::new(&opts).server_id();
            assert!((1_000_000..2_000_000).contains(&id));
        }
    }
}
