//! Storage abstraction the analytics core reads from and merges into.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::event::{is_system_event, Event, Properties, PAGEVIEW};
use crate::signature::EventSignature;
use crate::window::TimeWindow;

/// Which event types an [`EventQuery`] selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTypeFilter {
    Only(String),
    /// Everything except [`SYSTEM_EVENT_TYPES`](crate::event::SYSTEM_EVENT_TYPES).
    Custom,
}

impl EventTypeFilter {
    pub fn matches(&self, event_type: &str) -> bool {
        match self {
            EventTypeFilter::Only(t) => t == event_type,
            EventTypeFilter::Custom => !is_system_event(event_type),
        }
    }
}

/// Selects events for one website inside a window.
#[derive(Debug, Clone)]
pub struct EventQuery {
    pub website_id: String,
    pub event_types: EventTypeFilter,
    pub window: TimeWindow,
}

impl EventQuery {
    pub fn pageviews(website_id: &str, window: TimeWindow) -> Self {
        Self {
            website_id: website_id.to_string(),
            event_types: EventTypeFilter::Only(PAGEVIEW.to_string()),
            window,
        }
    }

    /// Custom events only; system events are filtered out by the store.
    pub fn custom(website_id: &str, window: TimeWindow) -> Self {
        Self {
            website_id: website_id.to_string(),
            event_types: EventTypeFilter::Custom,
            window,
        }
    }
}

/// One occurrence of a custom event, ready to be folded into its aggregate.
#[derive(Debug, Clone)]
pub struct AggregateMerge {
    pub website_id: String,
    pub event_type: String,
    pub signature: EventSignature,
    /// JSON object text of the occurrence's properties.
    pub sample_properties: String,
    pub seen_at: DateTime<Utc>,
}

/// A `custom_events_aggregated` row exactly as stored.
///
/// `sample_properties` is kept as raw JSON text; decoding happens in the
/// core so one corrupt row can be skipped without failing the listing.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub website_id: String,
    pub event_type: String,
    pub signature: String,
    pub count: i64,
    pub sample_properties: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// The running summary for one `(website_id, signature)`.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomEventAggregate {
    pub website_id: String,
    pub event_type: String,
    pub signature: String,
    pub count: i64,
    pub sample_properties: Properties,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl AggregateRow {
    pub fn decode(self) -> Result<CustomEventAggregate, serde_json::Error> {
        let sample_properties = match self.sample_properties.as_deref() {
            None | Some("") => Properties::new(),
            Some(raw) => serde_json::from_str(raw)?,
        };
        Ok(CustomEventAggregate {
            website_id: self.website_id,
            event_type: self.event_type,
            signature: self.signature,
            count: self.count,
            sample_properties,
            first_seen: self.first_seen,
            last_seen: self.last_seen,
        })
    }
}

/// Event source and custom-event aggregate store.
///
/// Self-hosted deployments use the DuckDB implementation; [`MemoryStore`]
/// backs tests and embedders.
///
/// [`MemoryStore`]: crate::memory::MemoryStore
#[async_trait]
pub trait EventStore: Send + Sync + 'static {
    /// Events matching `query`, in any order.
    async fn query_events(&self, query: &EventQuery) -> anyhow::Result<Vec<Event>>;

    /// Fold one occurrence into its aggregate as a single atomic step.
    ///
    /// Absent: insert with `count = 1` and `first_seen = last_seen = seen_at`.
    /// Present: increment `count`; replace `sample_properties` and advance
    /// `last_seen` only when `seen_at` is later than the stored `last_seen`.
    async fn upsert_aggregate(&self, merge: &AggregateMerge) -> anyhow::Result<()>;

    /// Aggregates for `website_id` with `last_seen >= since`.
    async fn aggregates_seen_since(
        &self,
        website_id: &str,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<AggregateRow>>;

    /// Delete every aggregate with `last_seen < cutoff`; returns rows deleted.
    async fn delete_aggregates_before(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64>;
}
