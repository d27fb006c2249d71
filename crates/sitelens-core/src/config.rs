use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: String,
    pub duckdb_memory_limit: String,
    /// Aggregates whose `last_seen` is older than this are swept. `0` disables
    /// the sweep.
    pub aggregate_retention_days: u32,
    pub sweep_interval_seconds: u64,
}

const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 3600;

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            data_dir: lookup("SITELENS_DATA_DIR").unwrap_or_else(|| "./data".to_string()),
            duckdb_memory_limit: lookup("SITELENS_DUCKDB_MEMORY")
                .unwrap_or_else(|| "1GB".to_string()),
            aggregate_retention_days: lookup("SITELENS_AGGREGATE_RETENTION_DAYS")
                .unwrap_or_else(|| "90".to_string())
                .parse()
                .map_err(|e| format!("invalid SITELENS_AGGREGATE_RETENTION_DAYS: {e}"))?,
            sweep_interval_seconds: lookup("SITELENS_SWEEP_INTERVAL_SECONDS")
                .and_then(|v| v.parse::<u64>().ok())
                .map(|v| v.clamp(60, 86_400))
                .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECONDS),
        })
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    pub fn db_path(&self) -> String {
        format!("{}/sitelens.db", self.data_dir)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).expect("config");
        assert_eq!(cfg.data_dir, "./data");
        assert_eq!(cfg.duckdb_memory_limit, "1GB");
        assert_eq!(cfg.aggregate_retention_days, 90);
        assert_eq!(cfg.sweep_interval(), Duration::from_secs(3600));
        assert_eq!(cfg.db_path(), "./data/sitelens.db");
    }

    #[test]
    fn sweep_interval_is_clamped() {
        let cfg = config(&[("SITELENS_SWEEP_INTERVAL_SECONDS", "5")]).expect("config");
        assert_eq!(cfg.sweep_interval_seconds, 60);
        let cfg = config(&[("SITELENS_SWEEP_INTERVAL_SECONDS", "999999")]).expect("config");
        assert_eq!(cfg.sweep_interval_seconds, 86_400);
    }

    #[test]
    fn unparsable_interval_falls_back_to_default() {
        let cfg = config(&[("SITELENS_SWEEP_INTERVAL_SECONDS", "hourly")]).expect("config");
        assert_eq!(cfg.sweep_interval_seconds, 3600);
    }

    #[test]
    fn malformed_retention_is_rejected() {
        let err = config(&[("SITELENS_AGGREGATE_RETENTION_DAYS", "-1")]).unwrap_err();
        assert!(err.contains("SITELENS_AGGREGATE_RETENTION_DAYS"));
    }

    #[test]
    fn retention_zero_is_accepted() {
        let cfg = config(&[("SITELENS_AGGREGATE_RETENTION_DAYS", "0")]).expect("config");
        assert_eq!(cfg.aggregate_retention_days, 0);
    }
}
