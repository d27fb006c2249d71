use std::collections::hash_map::Entry;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::event::Event;
use crate::store::{AggregateMerge, AggregateRow, EventQuery, EventStore};

/// An in-process [`EventStore`].
///
/// Each aggregate merge runs inside one write-lock critical section with no
/// await point, so concurrent callers never lose increments and a cancelled
/// caller leaves the entry either untouched or fully merged.
#[derive(Default)]
pub struct MemoryStore {
    events: RwLock<Vec<Event>>,
    aggregates: RwLock<HashMap<(String, String), AggregateRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append events to the event log.
    pub async fn insert_events(&self, events: &[Event]) {
        self.events.write().await.extend_from_slice(events);
    }

    /// Fetch one aggregate row by key.
    pub async fn aggregate(&self, website_id: &str, signature: &str) -> Option<AggregateRow> {
        self.aggregates
            .read()
            .await
            .get(&(website_id.to_string(), signature.to_string()))
            .cloned()
    }

    /// Store a row verbatim, replacing any row with the same key.
    pub async fn put_aggregate(&self, row: AggregateRow) {
        let key = (row.website_id.clone(), row.signature.clone());
        self.aggregates.write().await.insert(key, row);
    }

    pub async fn aggregate_count(&self) -> usize {
        self.aggregates.read().await.len()
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn query_events(&self, query: &EventQuery) -> anyhow::Result<Vec<Event>> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| e.website_id == query.website_id)
            .filter(|e| query.window.contains(e.created_at))
            .filter(|e| query.event_types.matches(&e.event_type))
            .cloned()
            .collect())
    }

    async fn upsert_aggregate(&self, merge: &AggregateMerge) -> anyhow::Result<()> {
        let key = (
            merge.website_id.clone(),
            merge.signature.as_str().to_string(),
        );
        let mut aggregates = self.aggregates.write().await;
        match aggregates.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(AggregateRow {
                    website_id: merge.website_id.clone(),
                    event_type: merge.event_type.clone(),
                    signature: merge.signature.as_str().to_string(),
                    count: 1,
                    sample_properties: Some(merge.sample_properties.clone()),
                    first_seen: merge.seen_at,
                    last_seen: merge.seen_at,
                });
            }
            Entry::Occupied(mut slot) => {
                let row = slot.get_mut();
                row.count += 1;
                if merge.seen_at > row.last_seen {
                    row.last_seen = merge.seen_at;
                    row.sample_properties = Some(merge.sample_properties.clone());
                }
            }
        }
        Ok(())
    }

    async fn aggregates_seen_since(
        &self,
        website_id: &str,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<AggregateRow>> {
        let aggregates = self.aggregates.read().await;
        Ok(aggregates
            .values()
            .filter(|row| row.website_id == website_id && row.last_seen >= since)
            .cloned()
            .collect())
    }

    async fn delete_aggregates_before(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        let mut aggregates = self.aggregates.write().await;
        let before = aggregates.len();
        aggregates.retain(|_, row| row.last_seen >= cutoff);
        Ok((before - aggregates.len()) as u64)
    }
}
