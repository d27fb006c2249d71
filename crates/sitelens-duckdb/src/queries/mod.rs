pub mod aggregates;
pub mod events;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDateTime, Utc};

/// Format used for every TIMESTAMP parameter bound by this crate.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// Parse `CAST(ts AS VARCHAR)` output back into UTC.
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .map(|naive| naive.and_utc())
        .map_err(|_| anyhow!("invalid_timestamp: {raw}"))
}
