use std::sync::Arc;

use sitelens_core::{config::Config, AnalyticsEngine};
use sitelens_duckdb::DuckDbBackend;

/// Shared state for the background tasks.
///
/// `engine` reads and writes through the same backend handle as `db`.
pub struct AppState {
    pub db: Arc<DuckDbBackend>,
    pub engine: AnalyticsEngine,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: DuckDbBackend, config: Config) -> Self {
        let db = Arc::new(db);
        Self {
            engine: AnalyticsEngine::new(db.clone()),
            db,
            config: Arc::new(config),
        }
    }
}
