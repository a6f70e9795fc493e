// src/config.rs
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not valid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite file holding credentials, sessions and listings.
    pub db_path: String,
    pub addr: SocketAddr,
    /// HTTP worker threads.
    pub http_workers: usize,
    /// Tenants synced in parallel during one run.
    pub sync_workers: usize,
    pub upstream_timeout: Duration,
    /// Scheduler interval. `None` means sync only runs on demand.
    pub sync_interval: Option<Duration>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: "listings.sqlite3".to_string(),
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            http_workers: 8,
            sync_workers: 4,
            upstream_timeout: Duration::from_secs(30),
            sync_interval: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset or blank keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(path) = get("LISTING_SYNC_DB") {
            cfg.db_path = path;
        }
        if let Some(addr) = get("LISTING_SYNC_ADDR") {
            cfg.addr = addr.trim().parse().map_err(|e| ConfigError::Invalid {
                var: "LISTING_SYNC_ADDR",
                reason: format!("{e}"),
            })?;
        }
        if let Some(v) = get("LISTING_SYNC_WORKERS") {
            cfg.http_workers = parse_positive("LISTING_SYNC_WORKERS", &v)? as usize;
        }
        if let Some(v) = get("LISTING_SYNC_SYNC_WORKERS") {
            cfg.sync_workers = parse_positive("LISTING_SYNC_SYNC_WORKERS", &v)? as usize;
        }
        if let Some(v) = get("LISTING_SYNC_UPSTREAM_TIMEOUT_SECS") {
            let secs = parse_positive("LISTING_SYNC_UPSTREAM_TIMEOUT_SECS", &v)?;
            cfg.upstream_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = get("LISTING_SYNC_INTERVAL_SECS") {
            let secs = parse_positive("LISTING_SYNC_INTERVAL_SECS", &v)?;
            cfg.sync_interval = Some(Duration::from_secs(secs));
        }

        Ok(cfg)
    }
}

fn parse_positive(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            var,
            reason: "must be greater than zero".into(),
        }),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
    }
}
