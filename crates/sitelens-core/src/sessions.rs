use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::event::Event;

/// Multi-page sessions longer than this are reported at the cap, so one idle
/// tab left open overnight does not drag the average up.
pub const MAX_SESSION_SECONDS: f64 = 1800.0;

/// Assumed dwell time of a single-page session without `time_on_page`.
pub const SINGLE_PAGE_FALLBACK_SECONDS: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStat {
    pub session_id: String,
    pub page_count: u32,
    pub duration_seconds: f64,
}

impl SessionStat {
    pub fn is_bounce(&self) -> bool {
        self.page_count == 1
    }
}

struct SessionSpan {
    page_count: u32,
    first: DateTime<Utc>,
    last: DateTime<Utc>,
    time_on_page: Option<f64>,
}

/// Group the pageview events of one window into per-session statistics.
///
/// Non-pageview events are ignored. Output is ordered by `session_id`.
pub fn reconstruct_sessions(events: &[Event]) -> Vec<SessionStat> {
    let mut spans: BTreeMap<&str, SessionSpan> = BTreeMap::new();

    for event in events.iter().filter(|e| e.is_pageview()) {
        spans
            .entry(event.session_id.as_str())
            .and_modify(|span| {
                span.page_count += 1;
                span.first = span.first.min(event.created_at);
                span.last = span.last.max(event.created_at);
                span.time_on_page = max_option(span.time_on_page, event.time_on_page);
            })
            .or_insert(SessionSpan {
                page_count: 1,
                first: event.created_at,
                last: event.created_at,
                time_on_page: event.time_on_page,
            });
    }

    spans
        .into_iter()
        .map(|(session_id, span)| SessionStat {
            session_id: session_id.to_string(),
            page_count: span.page_count,
            duration_seconds: session_duration(&span),
        })
        .collect()
}

fn session_duration(span: &SessionSpan) -> f64 {
    if span.page_count > 1 {
        let elapsed = (span.last - span.first).num_milliseconds() as f64 / 1000.0;
        elapsed.min(MAX_SESSION_SECONDS)
    } else {
        span.time_on_page.unwrap_or(SINGLE_PAGE_FALLBACK_SECONDS)
    }
}

fn max_option(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, None) => x,
        (None, y) => y,
    }
}
