use anyhow::Result;
use chrono::{DateTime, Utc};

use sitelens_core::store::{AggregateMerge, AggregateRow};

use crate::DuckDbBackend;

use super::{format_timestamp, parse_timestamp};

/// Fold one occurrence into `custom_events_aggregated` with a single
/// `INSERT ... ON CONFLICT DO UPDATE`.
///
/// The conflict branch reads the stored row, so the sample and `last_seen`
/// move only when `?5` is later than what is already there. One statement
/// means concurrent callers on the same key serialise inside DuckDB and
/// never lose an increment.
pub async fn upsert_aggregate_inner(db: &DuckDbBackend, merge: &AggregateMerge) -> Result<()> {
    let conn = db.conn.lock().await;
    let seen_at = format_timestamp(merge.seen_at);
    conn.execute(
        r#"INSERT INTO custom_events_aggregated (
               website_id, event_type, event_signature, event_count, sample_properties,
               first_seen, last_seen, created_at, updated_at
           ) VALUES (
               ?1, ?2, ?3, 1, ?4,
               CAST(?5 AS TIMESTAMP), CAST(?5 AS TIMESTAMP), CAST(?5 AS TIMESTAMP), CAST(?5 AS TIMESTAMP)
           )
           ON CONFLICT (website_id, event_signature) DO UPDATE SET
               event_count = custom_events_aggregated.event_count + 1,
               sample_properties = CASE
                   WHEN custom_events_aggregated.last_seen < EXCLUDED.last_seen
                       THEN EXCLUDED.sample_properties
                   ELSE custom_events_aggregated.sample_properties
               END,
               last_seen = GREATEST(custom_events_aggregated.last_seen, EXCLUDED.last_seen),
               updated_at = EXCLUDED.updated_at"#,
        duckdb::params![
            merge.website_id,
            merge.event_type,
            merge.signature.as_str(),
            merge.sample_properties,
            seen_at,
        ],
    )?;
    Ok(())
}

pub async fn aggregates_seen_since_inner(
    db: &DuckDbBackend,
    website_id: &str,
    since: DateTime<Utc>,
) -> Result<Vec<AggregateRow>> {
    let conn = db.conn.lock().await;
    let mut stmt = conn.prepare(
        r#"SELECT
               website_id,
               event_type,
               event_signature,
               event_count,
               sample_properties,
               CAST(first_seen AS VARCHAR),
               CAST(last_seen AS VARCHAR)
           FROM custom_events_aggregated
           WHERE website_id = ?1
             AND last_seen >= CAST(?2 AS TIMESTAMP)
           ORDER BY event_count DESC"#,
    )?;

    let rows = stmt.query_map(duckdb::params![website_id, format_timestamp(since)], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, i64>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, String>(6)?,
        ))
    })?;

    let mut aggregates = Vec::new();
    for row in rows {
        let (website_id, event_type, signature, count, sample_properties, first_seen, last_seen) =
            row?;
        aggregates.push(AggregateRow {
            website_id,
            event_type,
            signature,
            count,
            sample_properties,
            first_seen: parse_timestamp(&first_seen)?,
            last_seen: parse_timestamp(&last_seen)?,
        });
    }
    Ok(aggregates)
}

pub async fn delete_aggregates_before_inner(
    db: &DuckDbBackend,
    cutoff: DateTime<Utc>,
) -> Result<u64> {
    let conn = db.conn.lock().await;
    let deleted = conn.execute(
        "DELETE FROM custom_events_aggregated WHERE last_seen < CAST(?1 AS TIMESTAMP)",
        duckdb::params![format_timestamp(cutoff)],
    )?;
    Ok(deleted as u64)
}
