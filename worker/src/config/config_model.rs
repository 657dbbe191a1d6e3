use std::time::Duration;

use backend::config::config_model::{Database, Gateway, Poll};
use crates::infra::email::http_notifier::EmailApiConfig;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub worker_server: WorkerServer,
    pub database: Database,
    pub gateway: Gateway,
    pub poll: Poll,
    pub email: Option<EmailApiConfig>,
    pub status_polling: StatusPolling,
}

#[derive(Debug, Clone)]
pub struct WorkerServer {
    pub port: u16,
    pub timeout: u64,
    pub body_limit: u64,
}

#[derive(Debug, Clone)]
pub struct StatusPolling {
    /// Sleep between claims when the queue is empty.
    pub idle_interval: Duration,
    /// A `running` job locked longer than this is claimed again.
    pub stale_lock: Duration,
    /// Finished jobs older than this are deleted.
    pub job_retention: Duration,
}
