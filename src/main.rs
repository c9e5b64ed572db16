//! Command-line interface for binlogsql
//!
//! # Usage Examples
//!
//! ```bash
//! # Forward statements for the whole start file
//! binlogsql -u root -p secret --start-file mysql-bin.000003
//!
//! # Flashback statements for one table in a time range
//! binlogsql -u root -d shop -t orders --start-file mysql-bin.000003 \
//!   --start-datetime "2024-05-20 16:00:00" --stop-datetime "2024-05-20 16:30:00" \
//!   --flashback
//!
//! # Follow the log until interrupted
//! binlogsql -u root --start-file mysql-bin.000003 --stop-never
//! ```
//!
//! Statements go to stdout; logs go to stderr (`RUST_LOG` controls the level).

use binlogsql::Args;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("binlogsql=info,binlog_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    binlogsql::run(args).await?;
    Ok(())
}
