//! Datetime parsing utilities.

use anyhow::Context;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

/// Format accepted by `--start-datetime` and `--stop-datetime`.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a local wall-clock time like "2024-05-20 16:00:00".
///
/// During a DST fold the earlier of the two instants is used.
pub fn parse_local_datetime(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        anyhow::bail!("Empty datetime string");
    }

    let naive = NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .with_context(|| format!("Invalid datetime '{s}', expected format {DATETIME_FORMAT}"))?;

    let local = Local
        .from_local_datetime(&naive)
        .earliest()
        .with_context(|| format!("Datetime '{s}' does not exist in the local timezone"))?;

    Ok(local.with_timezone(&Utc))
}

/// Like [`parse_local_datetime`], treating a missing or blank value as unset.
pub fn parse_optional_datetime(s: Option<&str>) -> anyhow::Result<Option<DateTime<Utc>>> {
    match s.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_local_datetime(s).map(Some),
    }
}
