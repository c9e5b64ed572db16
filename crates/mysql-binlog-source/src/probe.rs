//! Server checks performed before streaming
//!
//! Row reconstruction only works against a server that logs full row images
//! in ROW format. The probe also reports the current end of the log, which
//! bounds a run that was given no explicit end position.

use anyhow::{anyhow, bail, Context, Result};
use binlog_core::StreamPosition;
use mysql_async::prelude::*;
use mysql_async::{Conn, Row};
use tracing::{debug, warn};

/// Binlog state of the connected server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    pub server_id: u32,
    /// Position right after the last event written so far.
    pub end_of_log: StreamPosition,
    /// Binary log files known to the server, oldest first.
    pub binlogs: Vec<String>,
    pub binlog_format: String,
    pub binlog_row_image: Option<String>,
}

impl ServerStatus {
    /// Fail unless the server can be read for row reconstruction starting
    /// at `start_file`.
    pub fn validate(&self, start_file: &str) -> Result<()> {
        if self.server_id == 0 {
            bail!("missing server_id in mysql server");
        }
        if !self.binlog_format.eq_ignore_ascii_case("ROW") {
            bail!(
                "binlog_format is {}, binlogsql requires ROW",
                self.binlog_format
            );
        }
        if !self.binlogs.iter().any(|name| name == start_file) {
            bail!("start_file {start_file} not in mysql server");
        }
        match self.binlog_row_image.as_deref() {
            Some(image) if !image.eq_ignore_ascii_case("FULL") => warn!(
                "binlog_row_image is {image}; statements only cover the logged columns"
            ),
            _ => {}
        }
        Ok(())
    }
}

/// Query server id, log format and binary log state.
pub async fn probe_server(conn: &mut Conn) -> Result<ServerStatus> {
    let server_id: u32 = conn
        .query_first("SELECT @@server_id")
        .await
        .context("Failed to query server_id")?
        .unwrap_or_default();

    let binlog_format: String = conn
        .query_first("SELECT @@binlog_format")
        .await
        .context("Failed to query binlog_format")?
        .ok_or_else(|| anyhow!("Missing binlog_format"))?;

    // Not available before MySQL 5.6
    let binlog_row_image: Option<String> = match conn
        .query_first::<Option<String>, _>("SELECT @@binlog_row_image")
        .await
    {
        Ok(value) => value.flatten(),
        Err(e) => {
            debug!("binlog_row_image unavailable: {}", e);
            None
        }
    };

    let end_of_log = end_of_log(conn).await?;

    let rows: Vec<Row> = conn
        .query("SHOW BINARY LOGS")
        .await
        .context("Failed to list binary logs")?;
    let mut binlogs = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = row
            .get(0)
            .ok_or_else(|| anyhow!("Missing log name in SHOW BINARY LOGS"))?;
        binlogs.push(name);
    }

    Ok(ServerStatus {
        server_id,
        end_of_log,
        binlogs,
        binlog_format,
        binlog_row_image,
    })
}

async fn end_of_log(conn: &mut Conn) -> Result<StreamPosition> {
    // MySQL 8.4 dropped SHOW MASTER STATUS in favour of SHOW BINARY LOG STATUS
    let row: Option<Row> = match conn.query_first("SHOW MASTER STATUS").await {
        Ok(row) => row,
        Err(e) => {
            debug!("SHOW MASTER STATUS failed, trying SHOW BINARY LOG STATUS: {}", e);
            conn.query_first("SHOW BINARY LOG STATUS")
                .await
                .context("Failed to read binary log status")?
        }
    };
    let row = row.ok_or_else(|| anyhow!("Binary logging is not enabled on the server"))?;

    let file: String = row
        .get(0)
        .ok_or_else(|| anyhow!("Missing file in binary log status"))?;
    let offset: u64 = row
        .get(1)
        .ok_or_else(|| anyhow!("Missing position in binary log status"))?;
    let offset = u32::try_from(offset).context("Binary log position out of range")?;
    Ok(StreamPosition::new(file, offset))
}
