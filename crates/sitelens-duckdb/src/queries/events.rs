use anyhow::Result;
use tracing::warn;

use sitelens_core::event::{Event, Properties, SYSTEM_EVENT_TYPES};
use sitelens_core::store::{EventQuery, EventTypeFilter};

use crate::DuckDbBackend;

use super::{format_timestamp, parse_timestamp};

struct EventRecord {
    website_id: String,
    event_type: String,
    visitor_id: String,
    session_id: String,
    created_at: String,
    time_on_page: Option<f64>,
    properties: Option<String>,
}

impl EventRecord {
    fn into_event(self) -> Result<Event> {
        Ok(Event {
            created_at: parse_timestamp(&self.created_at)?,
            properties: decode_properties(self.properties.as_deref(), &self.event_type),
            website_id: self.website_id,
            event_type: self.event_type,
            visitor_id: self.visitor_id,
            session_id: self.session_id,
            time_on_page: self.time_on_page,
        })
    }
}

/// Malformed property JSON on a stored event degrades to an empty set;
/// session and metric math never looks at properties.
fn decode_properties(raw: Option<&str>, event_type: &str) -> Properties {
    match raw {
        None | Some("") => Properties::new(),
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|err| {
            warn!(event_type = %event_type, error = %err, "Ignoring undecodable event properties");
            Properties::new()
        }),
    }
}

pub async fn query_events_inner(db: &DuckDbBackend, query: &EventQuery) -> Result<Vec<Event>> {
    let conn = db.conn.lock().await;

    let mut filter_sql = String::new();
    let mut params: Vec<Box<dyn duckdb::types::ToSql>> = vec![
        Box::new(query.website_id.clone()),
        Box::new(format_timestamp(query.window.start)),
        Box::new(format_timestamp(query.window.end)),
    ];
    match &query.event_types {
        EventTypeFilter::Only(event_type) => {
            filter_sql.push_str(" AND event_type = ?4");
            params.push(Box::new(event_type.clone()));
        }
        EventTypeFilter::Custom => {
            let placeholders: Vec<String> = SYSTEM_EVENT_TYPES
                .iter()
                .map(|system_type| {
                    params.push(Box::new(system_type.to_string()));
                    format!("?{}", params.len())
                })
                .collect();
            filter_sql.push_str(&format!(
                " AND event_type NOT IN ({})",
                placeholders.join(", ")
            ));
        }
    }

    let sql = format!(
        r#"
        SELECT
            website_id,
            event_type,
            visitor_id,
            session_id,
            CAST(created_at AS VARCHAR) AS created_at,
            time_on_page,
            properties
        FROM events
        WHERE website_id = ?1
          AND created_at >= CAST(?2 AS TIMESTAMP)
          AND created_at < CAST(?3 AS TIMESTAMP)
          {filter_sql}
        ORDER BY created_at
        "#
    );

    let param_refs: Vec<&dyn duckdb::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(param_refs.as_slice(), |row| {
        Ok(EventRecord {
            website_id: row.get(0)?,
            event_type: row.get(1)?,
            visitor_id: row.get(2)?,
            session_id: row.get(3)?,
            created_at: row.get(4)?,
            time_on_page: row.get(5)?,
            properties: row.get(6)?,
        })
    })?;

    let mut events = Vec::new();
    for record in rows {
        events.push(record?.into_event()?);
    }
    Ok(events)
}
