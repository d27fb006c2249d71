//! Entry points the request layer calls into.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::compare::{compare_metrics, ComparisonMetrics};
use crate::custom_events::{event_type_stats, merge_for_event, top_event_stats, CustomEventStat};
use crate::error::{CoreError, Result};
use crate::event::Event;
use crate::metrics::{dashboard_metrics, DashboardMetrics};
use crate::sessions::reconstruct_sessions;
use crate::store::{EventQuery, EventStore};
use crate::window::{days_before, TimeWindow};

/// Analytics over an [`EventStore`].
///
/// Stateless apart from the store handle; clone freely and share across
/// request handlers. Each `*_at` variant takes the reference instant
/// explicitly, the plain variant uses `Utc::now()`.
#[derive(Clone)]
pub struct AnalyticsEngine {
    store: Arc<dyn EventStore>,
}

impl AnalyticsEngine {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    pub async fn get_dashboard_metrics(
        &self,
        website_id: &str,
        days: i64,
    ) -> Result<DashboardMetrics> {
        self.get_dashboard_metrics_at(website_id, days, Utc::now()).await
    }

    pub async fn get_dashboard_metrics_at(
        &self,
        website_id: &str,
        days: i64,
        now: DateTime<Utc>,
    ) -> Result<DashboardMetrics> {
        require_website(website_id)?;
        let window = TimeWindow::last_days(days, now)?;
        self.metrics_for_window(website_id, window).await
    }

    pub async fn get_comparison_metrics(
        &self,
        website_id: &str,
        days: i64,
    ) -> Result<ComparisonMetrics> {
        self.get_comparison_metrics_at(website_id, days, Utc::now()).await
    }

    /// Compare the last `days` days with the `days` days before them.
    ///
    /// A failing previous-period read is treated as an empty baseline.
    pub async fn get_comparison_metrics_at(
        &self,
        website_id: &str,
        days: i64,
        now: DateTime<Utc>,
    ) -> Result<ComparisonMetrics> {
        require_website(website_id)?;
        let current_window = TimeWindow::last_days(days, now)?;
        let current = self.metrics_for_window(website_id, current_window).await?;

        let previous = match current_window.preceding() {
            Some(previous_window) => {
                match self.metrics_for_window(website_id, previous_window).await {
                    Ok(previous) => previous,
                    Err(err) => {
                        warn!(
                            website_id = %website_id,
                            days,
                            error = %err,
                            "Previous period unavailable, comparing against an empty baseline"
                        );
                        DashboardMetrics::default()
                    }
                }
            }
            None => {
                warn!(
                    website_id = %website_id,
                    days,
                    "Previous period out of range, comparing against an empty baseline"
                );
                DashboardMetrics::default()
            }
        };

        Ok(compare_metrics(&current, &previous))
    }

    pub async fn get_custom_event_stats(
        &self,
        website_id: &str,
        days: i64,
    ) -> Result<Vec<CustomEventStat>> {
        self.get_custom_event_stats_at(website_id, days, Utc::now()).await
    }

    /// Top custom events from the aggregate table, newest activity within
    /// the last `days` days.
    pub async fn get_custom_event_stats_at(
        &self,
        website_id: &str,
        days: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<CustomEventStat>> {
        require_website(website_id)?;
        let window = TimeWindow::last_days(days, now)?;
        let rows = self
            .store
            .aggregates_seen_since(website_id, window.start)
            .await
            .map_err(CoreError::Query)?;
        Ok(top_event_stats(rows))
    }

    pub async fn get_custom_event_type_stats(
        &self,
        website_id: &str,
        days: i64,
    ) -> Result<Vec<CustomEventStat>> {
        self.get_custom_event_type_stats_at(website_id, days, Utc::now()).await
    }

    /// Per-type custom event counts computed from raw events rather than
    /// the aggregate table.
    pub async fn get_custom_event_type_stats_at(
        &self,
        website_id: &str,
        days: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<CustomEventStat>> {
        require_website(website_id)?;
        let window = TimeWindow::last_days(days, now)?;
        let events = self
            .store
            .query_events(&EventQuery::custom(website_id, window))
            .await
            .map_err(CoreError::Query)?;
        Ok(event_type_stats(&events))
    }

    pub async fn record_custom_event(&self, event: &Event) -> Result<()> {
        self.record_custom_event_at(event, Utc::now()).await
    }

    /// Fold `event` into its `(website_id, signature)` aggregate as seen at
    /// `now`. System events are accepted and ignored.
    pub async fn record_custom_event_at(&self, event: &Event, now: DateTime<Utc>) -> Result<()> {
        let Some(merge) = merge_for_event(event, now)? else {
            debug!(
                website_id = %event.website_id,
                event_type = %event.event_type,
                "Skipping system event for custom aggregation"
            );
            return Ok(());
        };

        if let Err(err) = self.store.upsert_aggregate(&merge).await {
            error!(
                website_id = %merge.website_id,
                event_type = %merge.event_type,
                signature = %merge.signature,
                error = %err,
                "Failed to upsert custom event aggregation"
            );
            return Err(CoreError::Persistence(err));
        }

        debug!(
            website_id = %merge.website_id,
            event_type = %merge.event_type,
            signature = %merge.signature,
            "Custom event aggregated"
        );
        Ok(())
    }

    pub async fn cleanup_old_aggregates(&self, older_than_days: i64) -> Result<u64> {
        self.cleanup_old_aggregates_at(older_than_days, Utc::now()).await
    }

    /// Delete aggregates not seen during the last `older_than_days` days.
    pub async fn cleanup_old_aggregates_at(
        &self,
        older_than_days: i64,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        if older_than_days < 0 {
            return Err(CoreError::Validation(format!(
                "older_than_days must not be negative, got {older_than_days}"
            )));
        }
        let cutoff = days_before(now, older_than_days).ok_or_else(|| {
            CoreError::Validation(format!(
                "older_than_days of {older_than_days} is out of range"
            ))
        })?;
        let rows_deleted = self
            .store
            .delete_aggregates_before(cutoff)
            .await
            .map_err(CoreError::Persistence)?;
        info!(
            rows_deleted,
            older_than_days, "Cleaned up old aggregated custom events"
        );
        Ok(rows_deleted)
    }

    async fn metrics_for_window(
        &self,
        website_id: &str,
        window: TimeWindow,
    ) -> Result<DashboardMetrics> {
        let events = self
            .store
            .query_events(&EventQuery::pageviews(website_id, window))
            .await
            .map_err(CoreError::Query)?;
        let sessions = reconstruct_sessions(&events);
        Ok(dashboard_metrics(&events, &sessions))
    }
}

fn require_website(website_id: &str) -> Result<()> {
    if website_id.trim().is_empty() {
        return Err(CoreError::Validation("website_id is required".to_string()));
    }
    Ok(())
}
