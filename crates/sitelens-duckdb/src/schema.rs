/// DuckDB initialization SQL.
///
/// Executed once at database open time via `Connection::execute_batch`.
/// All statements use `IF NOT EXISTS` so they are safe to re-run on every
/// startup.
///
/// `memory_limit` comes from `Config.duckdb_memory_limit`
/// (env `SITELENS_DUCKDB_MEMORY`, default `"1GB"`). Always set it explicitly:
/// the DuckDB default (80% of system RAM) is not acceptable for a server
/// process.
///
/// NOTE: `custom_events_aggregated` has no secondary index. The merge
/// rewrites `last_seen`, and older DuckDB releases reject
/// `ON CONFLICT DO UPDATE` on columns referenced by an index.
pub fn init_sql(memory_limit: &str) -> String {
    format!(
        r#"SET memory_limit = '{memory_limit}';
SET threads = 2;

-- ===========================================
-- EVENTS (append-only, written by the ingest layer)
-- ===========================================
CREATE TABLE IF NOT EXISTS events (
    id              VARCHAR NOT NULL,              -- UUID v4
    website_id      VARCHAR NOT NULL,
    session_id      VARCHAR NOT NULL,
    visitor_id      VARCHAR NOT NULL,
    event_type      VARCHAR NOT NULL,              -- 'pageview' | 'session_start' | 'session_end' | custom
    properties      VARCHAR,                       -- JSON object text (nullable)
    time_on_page    DOUBLE,                        -- seconds, reported by the tracker (nullable)
    created_at      TIMESTAMP NOT NULL             -- UTC
);

-- Primary query pattern: website + type + date range
CREATE INDEX IF NOT EXISTS idx_events_website_type_time
    ON events(website_id, event_type, created_at);

-- Unfiltered listings (raw custom-event type stats)
CREATE INDEX IF NOT EXISTS idx_events_website_time
    ON events(website_id, created_at);

-- ===========================================
-- CUSTOM EVENT AGGREGATES (one row per website + signature)
-- ===========================================
-- Mutated only through the single-statement upsert in queries/aggregates.rs.
CREATE TABLE IF NOT EXISTS custom_events_aggregated (
    website_id        VARCHAR NOT NULL,
    event_type        VARCHAR NOT NULL,
    event_signature   VARCHAR(64) NOT NULL,        -- sha256 hex of type + sorted properties
    event_count       BIGINT NOT NULL DEFAULT 1,
    sample_properties VARCHAR,                     -- JSON object text of the newest occurrence
    first_seen        TIMESTAMP NOT NULL,
    last_seen         TIMESTAMP NOT NULL,
    created_at        TIMESTAMP NOT NULL,
    updated_at        TIMESTAMP NOT NULL,
    PRIMARY KEY (website_id, event_signature)
);
"#
    )
}
