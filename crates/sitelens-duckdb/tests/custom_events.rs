use std::sync::Arc;

use chrono::{DateTime, Duration, DurationRound, Utc};
use sitelens_core::{
    event::{Event, Properties},
    signature::event_signature,
    AnalyticsEngine,
};
use sitelens_duckdb::DuckDbBackend;

/// DuckDB stores microseconds; truncate so round-tripped values compare equal.
fn now() -> DateTime<Utc> {
    Utc::now()
        .duration_trunc(Duration::seconds(1))
        .expect("truncate")
}

fn props(raw: &str) -> Properties {
    serde_json::from_str(raw).expect("valid properties json")
}

fn custom(event_type: &str, properties: &str) -> Event {
    Event {
        website_id: "site_1".to_string(),
        event_type: event_type.to_string(),
        visitor_id: uuid::Uuid::new_v4().to_string(),
        session_id: uuid::Uuid::new_v4().to_string(),
        created_at: Utc::now(),
        time_on_page: None,
        properties: props(properties),
    }
}

fn setup() -> (Arc<DuckDbBackend>, AnalyticsEngine) {
    let db = Arc::new(DuckDbBackend::open_in_memory().expect("db"));
    let engine = AnalyticsEngine::new(db.clone());
    (db, engine)
}

async fn stored_row(
    db: &DuckDbBackend,
    signature: &str,
) -> Option<(i64, Option<String>, String, String)> {
    let conn = db.conn_for_test().await;
    conn.prepare(
        "SELECT event_count, sample_properties, CAST(first_seen AS VARCHAR), CAST(last_seen AS VARCHAR)
         FROM custom_events_aggregated
         WHERE website_id = 'site_1' AND event_signature = ?1",
    )
    .expect("prepare")
    .query_row(sitelens_duckdb::duckdb::params![signature], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    })
    .ok()
}

async fn row_count(db: &DuckDbBackend) -> i64 {
    let conn = db.conn_for_test().await;
    conn.prepare("SELECT COUNT(*) FROM custom_events_aggregated")
        .expect("prepare")
        .query_row([], |row| row.get(0))
        .expect("count")
}

#[tokio::test]
async fn test_first_occurrence_inserts_row() {
    let (db, engine) = setup();
    engine
        .record_custom_event(&custom("signup", r#"{"plan":"pro"}"#))
        .await
        .expect("record");

    let sig = event_signature("signup", &props(r#"{"plan":"pro"}"#));
    let (count, sample, first_seen, last_seen) =
        stored_row(&db, sig.as_str()).await.expect("row");
    assert_eq!(count, 1);
    assert_eq!(sample.as_deref(), Some(r#"{"plan":"pro"}"#));
    assert_eq!(first_seen, last_seen);
}

#[tokio::test]
async fn test_concurrent_signups_produce_one_row() {
    let (db, engine) = setup();

    let a = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .record_custom_event(&custom("signup", r#"{"plan":"pro"}"#))
                .await
        })
    };
    let b = {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .record_custom_event(&custom("signup", r#"{"plan":"pro"}"#))
                .await
        })
    };
    a.await.expect("join").expect("record a");
    b.await.expect("join").expect("record b");

    let sig = event_signature("signup", &props(r#"{"plan":"pro"}"#));
    let (count, ..) = stored_row(&db, sig.as_str()).await.expect("row");
    assert_eq!(count, 2);
    assert_eq!(row_count(&db).await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_writers_keep_exact_count() {
    let (db, engine) = setup();

    let mut handles = Vec::new();
    for _ in 0..50 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .record_custom_event(&custom("checkout", r#"{"currency":"EUR","amount":10}"#))
                .await
        }));
    }
    for h in handles {
        h.await.expect("join").expect("record");
    }

    let sig = event_signature("checkout", &props(r#"{"amount":10,"currency":"EUR"}"#));
    let (count, ..) = stored_row(&db, sig.as_str()).await.expect("row");
    assert_eq!(count, 50);
}

#[tokio::test]
async fn test_newer_merge_replaces_sample() {
    let (db, engine) = setup();
    let t1 = now() - Duration::minutes(10);
    let t2 = now();

    engine
        .record_custom_event_at(&custom("signup", r#"{"plan":"pro","coupon":null}"#), t1)
        .await
        .expect("t1");
    engine
        .record_custom_event_at(&custom("signup", r#"{"plan":"pro"}"#), t2)
        .await
        .expect("t2");

    let sig = event_signature("signup", &props(r#"{"plan":"pro"}"#));
    let (count, sample, first_seen, last_seen) =
        stored_row(&db, sig.as_str()).await.expect("row");
    assert_eq!(count, 2);
    assert_eq!(sample.as_deref(), Some(r#"{"plan":"pro"}"#));
    assert_eq!(first_seen, t1.format("%Y-%m-%d %H:%M:%S").to_string());
    assert_eq!(last_seen, t2.format("%Y-%m-%d %H:%M:%S").to_string());
}

#[tokio::test]
async fn test_stale_merge_keeps_sample_and_last_seen() {
    let (db, engine) = setup();
    let t_new = now();
    let t_old = now() - Duration::hours(1);

    engine
        .record_custom_event_at(&custom("signup", r#"{"plan":"pro"}"#), t_new)
        .await
        .expect("new");
    engine
        .record_custom_event_at(&custom("signup", r#"{"plan":"pro","coupon":null}"#), t_old)
        .await
        .expect("stale");

    let sig = event_signature("signup", &props(r#"{"plan":"pro"}"#));
    let (count, sample, _, last_seen) = stored_row(&db, sig.as_str()).await.expect("row");
    assert_eq!(count, 2);
    assert_eq!(sample.as_deref(), Some(r#"{"plan":"pro"}"#));
    assert_eq!(last_seen, t_new.format("%Y-%m-%d %H:%M:%S").to_string());
}

#[tokio::test]
async fn test_system_events_never_reach_the_table() {
    let (db, engine) = setup();
    for t in ["pageview", "session_start", "session_end"] {
        engine
            .record_custom_event(&custom(t, "{}"))
            .await
            .expect("no-op");
    }
    assert_eq!(row_count(&db).await, 0);
}

#[tokio::test]
async fn test_stats_group_order_and_skip_corrupt_rows() {
    let (db, engine) = setup();

    for _ in 0..3 {
        engine
            .record_custom_event(&custom("signup", r#"{"plan":"pro"}"#))
            .await
            .expect("signup");
    }
    engine
        .record_custom_event(&custom("click", r#"{"target":"cta"}"#))
        .await
        .expect("click");
    engine
        .record_custom_event_at(
            &custom("download", r#"{"file":"a.pdf"}"#),
            now() - Duration::days(45),
        )
        .await
        .expect("download");

    {
        let conn = db.conn_for_test().await;
        conn.execute(
            "INSERT INTO custom_events_aggregated (
                 website_id, event_type, event_signature, event_count, sample_properties,
                 first_seen, last_seen, created_at, updated_at
             ) VALUES (
                 'site_1', 'broken', 'deadbeef', 99, '{oops',
                 CURRENT_TIMESTAMP, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP
             )",
            [],
        )
        .expect("plant corrupt row");
    }

    let stats = engine
        .get_custom_event_stats("site_1", 30)
        .await
        .expect("stats");
    let types: Vec<&str> = stats.iter().map(|s| s.event_type.as_str()).collect();
    assert_eq!(types, vec!["signup", "click"]);
    assert_eq!(stats[0].count, 3);
    assert_eq!(stats[0].sample_properties, props(r#"{"plan":"pro"}"#));
    assert_eq!(stats[0].common_properties, stats[0].sample_properties);
}

#[tokio::test]
async fn test_cleanup_deletes_only_stale_rows() {
    let (db, engine) = setup();
    engine
        .record_custom_event_at(&custom("signup", "{}"), now() - Duration::days(120))
        .await
        .expect("old");
    engine
        .record_custom_event_at(&custom("click", "{}"), now() - Duration::days(2))
        .await
        .expect("recent");

    let deleted = engine.cleanup_old_aggregates(90).await.expect("cleanup");
    assert_eq!(deleted, 1);
    assert_eq!(row_count(&db).await, 1);

    let deleted = engine.cleanup_old_aggregates(90).await.expect("cleanup");
    assert_eq!(deleted, 0);
}
