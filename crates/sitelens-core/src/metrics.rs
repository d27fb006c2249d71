use std::collections::HashSet;

use serde::Serialize;

use crate::event::Event;
use crate::sessions::SessionStat;

/// Headline numbers for one website over one window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub page_views: i64,
    /// Distinct sessions. Kept separate from `sessions` because dashboards
    /// label it "visits"; both use the same formula.
    pub total_visitors: i64,
    pub unique_visitors: i64,
    pub sessions: i64,
    /// Share of single-page sessions, 0–100.
    pub bounce_rate: f64,
    pub avg_session_time: f64,
    pub pages_per_session: f64,
}

/// Combine the window's pageview events with their reconstructed sessions.
///
/// `sessions` must come from [`reconstruct_sessions`] over the same events.
///
/// [`reconstruct_sessions`]: crate::sessions::reconstruct_sessions
pub fn dashboard_metrics(events: &[Event], sessions: &[SessionStat]) -> DashboardMetrics {
    let pageviews: Vec<&Event> = events.iter().filter(|e| e.is_pageview()).collect();

    let page_views = pageviews.len() as i64;
    let distinct_sessions = pageviews
        .iter()
        .map(|e| e.session_id.as_str())
        .collect::<HashSet<_>>()
        .len() as i64;
    let unique_visitors = pageviews
        .iter()
        .map(|e| e.visitor_id.as_str())
        .collect::<HashSet<_>>()
        .len() as i64;

    let bounce_rate = if sessions.is_empty() {
        0.0
    } else {
        let bounced = sessions.iter().filter(|s| s.is_bounce()).count() as f64;
        (bounced * 100.0 / sessions.len() as f64).clamp(0.0, 100.0)
    };

    let avg_session_time = if sessions.is_empty() {
        0.0
    } else {
        sessions.iter().map(|s| s.duration_seconds).sum::<f64>() / sessions.len() as f64
    };

    let pages_per_session = if distinct_sessions == 0 {
        0.0
    } else {
        page_views as f64 / distinct_sessions as f64
    };

    DashboardMetrics {
        page_views,
        total_visitors: distinct_sessions,
        unique_visitors,
        sessions: distinct_sessions,
        bounce_rate,
        avg_session_time,
        pages_per_session,
    }
}
