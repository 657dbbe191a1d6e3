use std::time::Duration;

use anyhow::{Context, Result};
use backend::config::config_loader::{load_database, load_email, load_gateway, load_poll};

use super::config_model::{DotEnvyConfig, StatusPolling, WorkerServer};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let worker_server = WorkerServer {
        port: std::env::var("SERVER_PORT_WORKER")
            .context("SERVER_PORT_WORKER is invalid")?
            .parse()
            .context("SERVER_PORT_WORKER is invalid")?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .unwrap_or_else(|_| "1".to_string())
            .parse()
            .context("SERVER_BODY_LIMIT is invalid")?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .context("SERVER_TIMEOUT is invalid")?,
    };

    let status_polling = StatusPolling {
        idle_interval: Duration::from_secs(positive_var("WORKER_POLL_INTERVAL_SECONDS", 5)),
        stale_lock: Duration::from_secs(positive_var("WORKER_STALE_LOCK_SECONDS", 300)),
        job_retention: Duration::from_secs(
            positive_var("WORKER_JOB_RETENTION_HOURS", 168) * 3600,
        ),
    };

    Ok(DotEnvyConfig {
        worker_server,
        database: load_database()?,
        gateway: load_gateway()?,
        poll: load_poll()?,
        email: load_email(),
        status_polling,
    })
}

/// Unset, unparsable or zero values fall back to `default`.
fn positive_var(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
