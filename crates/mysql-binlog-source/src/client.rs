//! MySQL client utilities
//!
//! Connection options shared by the catalog pool and the replication
//! connection.

use anyhow::Result;
use mysql_async::{Opts, OptsBuilder, Pool};

use crate::SourceOpts;

/// Connection options for `opts`, without a default database.
pub fn replication_opts(opts: &SourceOpts) -> Opts {
    let password = (!opts.password.is_empty()).then(|| opts.password.clone());
    let builder = OptsBuilder::default()
        .ip_or_hostname(opts.host.clone())
        .tcp_port(opts.port)
        .user(Some(opts.user.clone()))
        .pass(password);
    Opts::from(builder)
}

/// Create a new MySQL connection pool
pub fn new_mysql_pool(opts: &SourceOpts) -> Result<Pool> {
    let pool = Pool::new(replication_opts(opts));
    Ok(pool)
}
