//! MySQL collaborators for binlogsql
//!
//! Streams the binary log over a replication connection and answers
//! column-layout questions from `INFORMATION_SCHEMA`. The reconstruction
//! logic itself lives in `binlog-core`; this crate only adapts MySQL to its
//! traits.

mod catalog;
mod client;
mod cursor;
mod probe;
pub mod value;

// Make testing module available for integration tests
#[doc(hidden)]
pub mod testing;

pub use catalog::MySQLSchemaCatalog;
pub use client::{new_mysql_pool, replication_opts};
pub use cursor::{MySQLBinlogCursor, MySQLBinlogSource};
pub use probe::{probe_server, ServerStatus};

/// MySQL connection options
#[derive(Clone, Debug)]
pub struct SourceOpts {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

impl SourceOpts {
    /// `host:port`, for log messages.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
