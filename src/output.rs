//! Statement output
//!
//! Every statement is printed as one line: the SQL, a terminating `;` and a
//! trailing comment with the log position right after the originating event
//! and the local time the event was written.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use binlog_core::{GeneratedStatement, StatementKind, StatementSink};
use chrono::Local;
use colored::Colorize;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::config::datetime::DATETIME_FORMAT;

/// `sql; #end mysql-bin.000003:500 time 2024-05-20 16:00:00`
pub fn format_line(statement: &GeneratedStatement) -> String {
    let time = statement
        .timestamp
        .with_timezone(&Local)
        .format(DATETIME_FORMAT);
    match &statement.position {
        Some(position) => format!("{}; #end {} time {}", statement.sql, position, time),
        None => format!("{}; #time {}", statement.sql, time),
    }
}

/// Writes statements to a terminal-like writer, optionally colored by kind.
pub struct ConsoleSink<W> {
    out: W,
    color: bool,
}

impl ConsoleSink<std::io::Stdout> {
    pub fn stdout(color: bool) -> Self {
        Self::new(std::io::stdout(), color)
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, statement: &GeneratedStatement) -> String {
        let line = format_line(statement);
        if !self.color {
            return line;
        }
        match statement.kind {
            StatementKind::Insert => line.green().to_string(),
            StatementKind::Update => line.yellow().to_string(),
            StatementKind::Delete => line.red().to_string(),
            StatementKind::Other => line,
        }
    }
}

#[async_trait]
impl<W: Write + Send> StatementSink for ConsoleSink<W> {
    async fn emit(&mut self, statement: &GeneratedStatement) -> Result<()> {
        let line = self.paint(statement);
        writeln!(self.out, "{line}").context("Failed to write statement to console")?;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.out.flush().context("Failed to flush console output")
    }
}

/// Appends plain statement lines to a file.
pub struct FileSink {
    writer: BufWriter<tokio::fs::File>,
}

impl FileSink {
    /// Create (or truncate) the file at `path`.
    pub async fn create(path: &Path) -> Result<Self> {
        let file = tokio::fs::File::create(path)
            .await
            .with_context(|| format!("Failed to create output file {}", path.display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

#[async_trait]
impl StatementSink for FileSink {
    async fn emit(&mut self, statement: &GeneratedStatement) -> Result<()> {
        let mut line = format_line(statement);
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .await
            .context("Failed to write statement to file")?;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.writer
            .flush()
            .await
            .context("Failed to flush output file")
    }
}

/// Hands every statement to each inner sink in turn.
#[derive(Default)]
pub struct FanoutSink {
    sinks: Vec<Box<dyn StatementSink>>,
}

impl FanoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl StatementSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl StatementSink for FanoutSink {
    async fn emit(&mut self, statement: &GeneratedStatement) -> Result<()> {
        for sink in &mut self.sinks {
            sink.emit(statement).await?;
        }
        Ok(())
    }

    /// Finishes every sink even when one fails; the first error wins.
    async fn finish(&mut self) -> Result<()> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.finish().await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binlog_core::StreamPosition;
    use chrono::{TimeZone, Utc};

    fn statement(kind: StatementKind, sql: &str) -> GeneratedStatement {
        GeneratedStatement::new(
            Utc.with_ymd_and_hms(2024, 5, 20, 8, 0, 0).unwrap(),
            sql.to_string(),
            kind,
        )
    }

    fn local_time(statement: &GeneratedStatement) -> String {
        statement
            .timestamp
            .with_timezone(&Local)
            .format(DATETIME_FORMAT)
            .to_string()
    }

    #[test]
    fn test_format_line_with_position() {
        let stmt = statement(StatementKind::Delete, "DELETE FROM db.t WHERE `id`=1 LIMIT 1")
            .at(StreamPosition::new("mysql-bin.000003", 500));
        assert_eq!(
            format_line(&stmt),
            format!(
                "DELETE FROM db.t WHERE `id`=1 LIMIT 1; #end mysql-bin.000003:500 time {}",
                local_time(&stmt)
            )
        );
    }

    #[test]
    fn test_format_line_without_position() {
        let stmt = statement(StatementKind::Other, "CREATE TABLE t (id INT)");
        assert_eq!(
            format_line(&stmt),
            format!("CREATE TABLE t (id INT); #time {}", local_time(&stmt))
        );
    }

    #[tokio::test]
    async fn test_console_sink_plain() {
        let mut sink = ConsoleSink::new(Vec::new(), false);
        let stmt = statement(StatementKind::Insert, "INSERT INTO db.t(`id`) VALUES (1)");
        sink.emit(&stmt).await.unwrap();
        sink.finish().await.unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, format!("{}\n", format_line(&stmt)));
    }

    #[tokio::test]
    async fn test_console_sink_colored_keeps_text() {
        colored::control::set_override(true);
        let mut sink = ConsoleSink::new(Vec::new(), true);
        let stmt = statement(StatementKind::Update, "UPDATE db.t SET `a`=1 WHERE `id`=1 LIMIT 1");
        sink.emit(&stmt).await.unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert!(out.contains("UPDATE db.t SET `a`=1 WHERE `id`=1 LIMIT 1;"));
        assert!(out.contains('\u{1b}'));
    }

    #[tokio::test]
    async fn test_file_sink_writes_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.sql");

        let mut sink = FileSink::create(&path).await.unwrap();
        let first = statement(StatementKind::Insert, "INSERT INTO db.t(`id`) VALUES (1)");
        let second = statement(StatementKind::Delete, "DELETE FROM db.t WHERE `id`=1 LIMIT 1");
        sink.emit(&first).await.unwrap();
        sink.emit(&second).await.unwrap();
        sink.finish().await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines, vec![format_line(&first), format_line(&second)]);
    }

    #[tokio::test]
    async fn test_fanout_reaches_every_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fanout.sql");

        let mut sink = FanoutSink::new()
            .with(FileSink::create(&path).await.unwrap())
            .with(Vec::<GeneratedStatement>::new());
        assert_eq!(sink.len(), 2);

        let stmt = statement(StatementKind::Insert, "INSERT INTO db.t(`id`) VALUES (1)");
        sink.emit(&stmt).await.unwrap();
        sink.finish().await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.trim_end(), format_line(&stmt));
    }
}
