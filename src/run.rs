//! Run orchestration: probe the server, wire the collaborators, drive the
//! controller.

use anyhow::{Context, Result};
use binlog_core::{Controller, EventFilter, RunSummary};
use binlogsql_mysql_source::{
    new_mysql_pool, probe_server, MySQLBinlogSource, MySQLSchemaCatalog,
};
use tracing::{info, warn};

use crate::output::{ConsoleSink, FanoutSink, FileSink};
use crate::Args;

/// Sinks selected by `--quiet`, `--no-color` and `--save`.
pub async fn build_sink(args: &Args) -> Result<FanoutSink> {
    let mut sink = FanoutSink::new();
    if !args.quiet {
        sink = sink.with(ConsoleSink::stdout(!args.no_color));
    }
    if args.save {
        sink = sink.with(FileSink::create(&args.save_path).await?);
        info!("Saving statements to {}", args.save_path.display());
    }
    Ok(sink)
}

/// Reconstruct the statements selected by `args` and hand them to the
/// configured sinks.
pub async fn run(args: Args) -> Result<RunSummary> {
    let opts = args.source_opts();
    let pool = new_mysql_pool(&opts)?;

    let mut conn = pool
        .get_conn()
        .await
        .with_context(|| format!("Failed to connect to MySQL at {}", opts.address()))?;
    let status = probe_server(&mut conn).await?;
    drop(conn);

    status.validate(&args.start_file)?;
    info!(
        "Connected to MySQL at {} (server_id {}, end of log {})",
        opts.address(),
        status.server_id,
        status.end_of_log
    );

    let window = args.window(Some(&status.end_of_log))?;
    let filter = EventFilter::new(args.filter_spec());
    let mut sink = build_sink(&args).await?;

    let result = {
        let catalog = MySQLSchemaCatalog::new(pool.clone());
        let source = MySQLBinlogSource::new(&opts);
        let mut controller = Controller::new(window, filter, args.translate_mode());
        controller.run(source, &catalog, &mut sink).await
    };

    if let Err(e) = pool.disconnect().await {
        warn!("Failed to disconnect MySQL pool: {}", e);
    }

    let summary = result.context("Binlog reconstruction failed")?;
    info!(
        "Finished at {}: {} events, {} statements, {} rows filtered, {} rows before start time ({})",
        summary
            .position
            .as_ref()
            .map_or_else(|| "start".to_string(), ToString::to_string),
        summary.events,
        summary.statements,
        summary.filtered_rows,
        summary.skipped_rows,
        summary
            .stop_reason
            .as_ref()
            .map_or_else(|| "no stop reason".to_string(), ToString::to_string),
    );
    Ok(summary)
}
