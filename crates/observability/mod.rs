mod config;
mod discord;
mod notify_layer;

use std::sync::Arc;

use anyhow::Result;
use config::ObservabilityConfig;
use discord::DiscordSink;
use notify_layer::{AlertDispatcher, ErrorNotifyLayer};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Installs the global subscriber: fmt output filtered by `RUST_LOG`
/// (default `info`) plus an optional Discord alert sink.
///
/// Must be called from inside a tokio runtime when Discord alerts are enabled.
pub fn init_observability(component: &str) -> Result<()> {
    let config = ObservabilityConfig::from_env(component);

    let notify_layer = match config.discord.as_ref() {
        Some(discord) => {
            let sink = DiscordSink::new(discord.webhook_url.clone())?;
            let dispatcher = AlertDispatcher::spawn(Arc::new(sink));
            Some(
                ErrorNotifyLayer::new(dispatcher, config.service.clone())
                    .with_filter(LevelFilter::from_level(discord.min_level)),
            )
        }
        None => None,
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339());

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(notify_layer)
        .with(env_filter)
        .try_init()?;

    for warning in &config.warnings {
        warn!(
            service = %config.service.service_name,
            component = %config.service.component,
            %warning,
            "observability: config warning"
        );
    }

    info!(
        service = %config.service.service_name,
        environment = %config.service.environment,
        component = %config.service.component,
        discord_alerts = config.discord.is_some(),
        "observability: tracing initialised"
    );

    Ok(())
}
