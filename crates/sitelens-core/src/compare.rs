use serde::Serialize;

use crate::metrics::DashboardMetrics;

/// Period-over-period change of each headline metric, in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComparisonMetrics {
    pub total_visitor_change: f64,
    pub visitor_change: f64,
    pub pageview_change: f64,
    pub session_change: f64,
    pub bounce_change: f64,
    pub duration_change: f64,
}

/// Relative change from `previous` to `current`, in percent.
///
/// A zero baseline reports `100.0` for any growth and `0.0` otherwise.
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        if current > 0.0 {
            100.0
        } else {
            0.0
        }
    } else {
        (current - previous) / previous * 100.0
    }
}

pub fn count_change(current: i64, previous: i64) -> f64 {
    percent_change(current as f64, previous as f64)
}

pub fn compare_metrics(current: &DashboardMetrics, previous: &DashboardMetrics) -> ComparisonMetrics {
    ComparisonMetrics {
        total_visitor_change: count_change(current.total_visitors, previous.total_visitors),
        visitor_change: count_change(current.unique_visitors, previous.unique_visitors),
        pageview_change: count_change(current.page_views, previous.page_views),
        session_change: count_change(current.sessions, previous.sessions),
        bounce_change: percent_change(current.bounce_rate, previous.bounce_rate),
        duration_change: percent_change(current.avg_session_time, previous.avg_session_time),
    }
}
