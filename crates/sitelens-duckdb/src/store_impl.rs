use async_trait::async_trait;
use chrono::{DateTime, Utc};

use sitelens_core::event::Event;
use sitelens_core::store::{AggregateMerge, AggregateRow, EventQuery, EventStore};

use crate::queries::{aggregates, events};
use crate::DuckDbBackend;

#[async_trait]
impl EventStore for DuckDbBackend {
    async fn query_events(&self, query: &EventQuery) -> anyhow::Result<Vec<Event>> {
        events::query_events_inner(self, query).await
    }

    async fn upsert_aggregate(&self, merge: &AggregateMerge) -> anyhow::Result<()> {
        aggregates::upsert_aggregate_inner(self, merge).await
    }

    async fn aggregates_seen_since(
        &self,
        website_id: &str,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<AggregateRow>> {
        aggregates::aggregates_seen_since_inner(self, website_id, since).await
    }

    async fn delete_aggregates_before(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        aggregates::delete_aggregates_before_inner(self, cutoff).await
    }
}
