use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Custom event properties. Keys iterate in lexicographic order, so two
/// property sets with the same pairs always serialize identically.
pub type Properties = BTreeMap<String, serde_json::Value>;

pub const PAGEVIEW: &str = "pageview";
pub const SESSION_START: &str = "session_start";
pub const SESSION_END: &str = "session_end";

/// Event types emitted by the tracker itself. These never reach the
/// custom-event aggregate table.
pub const SYSTEM_EVENT_TYPES: [&str; 3] = [PAGEVIEW, SESSION_START, SESSION_END];

pub fn is_system_event(event_type: &str) -> bool {
    SYSTEM_EVENT_TYPES.contains(&event_type)
}

/// A visitor event as stored by the ingest layer.
///
/// The analytics core never writes these; it reads them back from an
/// [`EventStore`](crate::store::EventStore) for a bounded time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub website_id: String,
    pub event_type: String,
    pub visitor_id: String,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    /// Seconds the visitor spent on the page, when the tracker reported it.
    pub time_on_page: Option<f64>,
    #[serde(default)]
    pub properties: Properties,
}

impl Event {
    /// Reject events missing the fields every downstream step keys on.
    pub fn validate(&self) -> Result<()> {
        if self.website_id.trim().is_empty() {
            return Err(CoreError::Validation("website_id is required".to_string()));
        }
        if self.event_type.trim().is_empty() {
            return Err(CoreError::Validation("event_type is required".to_string()));
        }
        Ok(())
    }

    pub fn is_pageview(&self) -> bool {
        self.event_type == PAGEVIEW
    }
}
