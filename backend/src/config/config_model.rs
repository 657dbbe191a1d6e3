use std::time::Duration;

use crates::{infra::email::http_notifier::EmailApiConfig, payments::gateway_client::GatewayClientConfig};

use crate::usecases::{payments::PaymentSettings, reconciler::ReconcilerConfig};

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub backend_server: BackendServer,
    pub database: Database,
    pub auth: AuthSecret,
    pub gateway: Gateway,
    pub poll: Poll,
    pub payments: PaymentSettings,
    pub email: Option<EmailApiConfig>,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Clone)]
pub struct AuthSecret {
    pub jwt_secret: String,
}

impl std::fmt::Debug for AuthSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSecret").finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct Gateway {
    pub client: GatewayClientConfig,
    /// `None` accepts unsigned webhooks (local development).
    pub webhook_secret: Option<String>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("base_url", &self.client.base_url)
            .field("timeout", &self.client.timeout)
            .field("webhook_signed", &self.webhook_secret.is_some())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct Poll {
    pub after_seconds: u64,
    pub retry_after_seconds: u64,
    pub fallback_enabled: bool,
}

/// Reconciler settings shared by the HTTP server and the poll worker.
pub fn reconciler_config(poll: &Poll, gateway: &Gateway) -> ReconcilerConfig {
    ReconcilerConfig {
        poll_after: Duration::from_secs(poll.after_seconds),
        poll_retry_after: Duration::from_secs(poll.retry_after_seconds),
        poll_fallback_enabled: poll.fallback_enabled,
        webhook_secret: gateway.webhook_secret.clone(),
    }
}
