//! binlogsql
//!
//! Reads a MySQL row-based binary log over a replication connection and
//! prints the SQL that reproduces each row change, or with `--flashback` the
//! SQL that undoes it.
//!
//! # CLI Usage
//!
//! ```bash
//! # Statements for one table between two positions
//! binlogsql -h 127.0.0.1 -u root -p secret -d shop -t orders \
//!   --start-file mysql-bin.000003 --start-pos 4 --end-pos 1200
//!
//! # Undo everything written after 16:00, saving the statements to a file
//! binlogsql -u root -d shop --start-file mysql-bin.000003 \
//!   --start-datetime "2024-05-20 16:00:00" --flashback --save --save-path undo.sql
//! ```
//!
//! The engine itself lives in `binlog-core`; the MySQL protocol side lives in
//! `binlogsql-mysql-source`.

use std::path::PathBuf;

use anyhow::Result;
use binlog_core::{FilterSpec, StreamPosition, TranslateMode, WindowBounds};
use binlogsql_mysql_source::SourceOpts;
use clap::Parser;

pub mod config;
pub mod output;
mod run;

pub use run::{build_sink, run};

use config::datetime::parse_optional_datetime;

/// First event offset in every binlog file, right after the magic header.
pub const BINLOG_START_OFFSET: u32 = 4;

#[derive(Parser, Clone, Debug)]
#[command(name = "binlogsql")]
#[command(about = "Reconstruct SQL or flashback SQL from a MySQL binary log")]
#[command(disable_help_flag = true)]
pub struct Args {
    /// MySQL host
    #[arg(short = 'h', long, default_value = "127.0.0.1")]
    pub host: String,

    /// MySQL port
    #[arg(short = 'P', long, default_value_t = 3306)]
    pub port: u16,

    /// MySQL user
    #[arg(short = 'u', long, default_value = "root")]
    pub user: String,

    /// MySQL password
    #[arg(
        short = 'p',
        long,
        default_value = "",
        env = "MYSQL_PWD",
        hide_env_values = true
    )]
    pub password: String,

    /// Only emit statements for this database
    #[arg(short = 'd', long)]
    pub database: Option<String>,

    /// Only emit statements for these tables (e.g. -t users,orders)
    #[arg(short = 't', long, value_delimiter = ',')]
    pub tables: Vec<String>,

    /// Binlog file to start reading from (e.g. mysql-bin.000002)
    #[arg(long)]
    pub start_file: String,

    /// Offset in the start file; 0 means the first event of the file
    #[arg(long, default_value_t = 0)]
    pub start_pos: u32,

    /// Binlog file to stop in (defaults to the start file when --end-pos is set)
    #[arg(long)]
    pub end_file: Option<String>,

    /// Offset to stop at; 0 means the end of the end file
    #[arg(long, default_value_t = 0)]
    pub end_pos: u32,

    /// Skip row changes written before this local time (format: %Y-%m-%d %H:%M:%S)
    #[arg(long)]
    pub start_datetime: Option<String>,

    /// Stop once the wall clock passes this local time (format: %Y-%m-%d %H:%M:%S)
    #[arg(long)]
    pub stop_datetime: Option<String>,

    /// Emit statements that undo each row change
    #[arg(long)]
    pub flashback: bool,

    /// Keep waiting for new events instead of stopping at the end of the log
    #[arg(long)]
    pub stop_never: bool,

    /// Also write statements to --save-path
    #[arg(long)]
    pub save: bool,

    /// File written with --save
    #[arg(long, default_value = "binlogsql.sql")]
    pub save_path: PathBuf,

    /// Do not print statements to the console
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Print help
    #[arg(long, action = clap::ArgAction::Help)]
    pub help: Option<bool>,
}

impl Args {
    pub fn source_opts(&self) -> SourceOpts {
        SourceOpts {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }

    pub fn filter_spec(&self) -> FilterSpec {
        FilterSpec::new(self.database.clone(), self.tables.iter().map(|t| t.trim()))
    }

    pub fn translate_mode(&self) -> TranslateMode {
        TranslateMode::from_flashback(self.flashback)
    }

    pub fn start_position(&self) -> StreamPosition {
        let offset = if self.start_pos == 0 {
            BINLOG_START_OFFSET
        } else {
            self.start_pos
        };
        StreamPosition::new(self.start_file.clone(), offset)
    }

    /// Explicit end bound from `--end-file` / `--end-pos`, if any.
    pub fn end_position(&self) -> Option<StreamPosition> {
        if self.end_file.is_none() && self.end_pos == 0 {
            return None;
        }
        let file = self.end_file.as_ref().unwrap_or(&self.start_file).clone();
        let offset = if self.end_pos == 0 {
            u32::MAX
        } else {
            self.end_pos
        };
        Some(StreamPosition::new(file, offset))
    }

    /// Window for this run.
    ///
    /// Without an explicit end bound, `--stop-never` or `--stop-datetime`, a
    /// one-shot run stops at `end_of_log`, the end of the log when the run
    /// started.
    pub fn window(&self, end_of_log: Option<&StreamPosition>) -> Result<WindowBounds> {
        let stop_time = parse_optional_datetime(self.stop_datetime.as_deref())?;
        let end_position = match self.end_position() {
            Some(end) => Some(end),
            None if self.stop_never || stop_time.is_some() => None,
            None => end_of_log.cloned(),
        };

        Ok(WindowBounds {
            start_position: Some(self.start_position()),
            end_position,
            start_time: parse_optional_datetime(self.start_datetime.as_deref())?,
            stop_time,
            stop_never: self.stop_never,
        })
    }
}
