use std::sync::Arc;

use tracing::{debug, error, info};

use crate::state::AppState;

/// Run one retention sweep and return the number of aggregates deleted.
///
/// A retention of `0` days disables the sweep.
pub async fn sweep_once(state: &Arc<AppState>) -> anyhow::Result<u64> {
    let days = state.config.aggregate_retention_days;
    if days == 0 {
        debug!("Aggregate retention disabled, skipping sweep");
        return Ok(0);
    }
    Ok(state.engine.cleanup_old_aggregates(i64::from(days)).await?)
}

pub async fn run_retention_loop(state: Arc<AppState>) {
    let tick = state.config.sweep_interval();
    info!(
        tick_seconds = tick.as_secs(),
        retention_days = state.config.aggregate_retention_days,
        "Aggregate retention sweeper started"
    );
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        if let Err(err) = sweep_once(&state).await {
            error!(error = %err, "aggregate retention sweep failed");
        }
    }
}
