use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use sitelens_worker::{scheduler, state::AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sitelens=info".parse()?),
        )
        .json()
        .init();

    let cfg = sitelens_core::config::Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    std::fs::create_dir_all(&cfg.data_dir)?;
    let db = sitelens_duckdb::DuckDbBackend::open(&cfg.db_path(), &cfg.duckdb_memory_limit)?;
    db.ping().await?;
    let state = Arc::new(AppState::new(db, cfg));

    // `sitelens sweep` runs a single retention pass and exits.
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(|s| s.as_str()) == Some("sweep") {
        let deleted = scheduler::sweep_once(&state).await?;
        info!(rows_deleted = deleted, "One-shot sweep finished");
        return Ok(());
    }

    {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            scheduler::run_retention_loop(state).await;
        });
    }

    info!(db_path = %state.config.db_path(), "Sitelens worker running");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    Ok(())
}
