use std::env;

use tracing::Level;
use url::Url;

#[derive(Debug, Clone)]
pub(crate) struct ServiceContext {
    pub(crate) service_name: String,
    pub(crate) environment: String,
    pub(crate) component: String,
}

#[derive(Debug, Clone)]
pub(crate) struct DiscordConfig {
    pub(crate) webhook_url: Url,
    pub(crate) min_level: Level,
}

#[derive(Debug, Clone)]
pub(crate) struct ObservabilityConfig {
    pub(crate) service: ServiceContext,
    pub(crate) discord: Option<DiscordConfig>,
    /// Logged once the subscriber exists.
    pub(crate) warnings: Vec<String>,
}

impl ObservabilityConfig {
    pub(crate) fn from_env(component: &str) -> Self {
        Self::from_lookup(component, |key| env::var(key).ok())
    }

    fn from_lookup(component: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let component = component.trim().to_string();

        let service = ServiceContext {
            service_name: non_empty("SERVICE_NAME").unwrap_or_else(|| format!("payments-{component}")),
            environment: non_empty("STAGE").unwrap_or_else(|| "unknown".to_string()),
            component,
        };

        let mut warnings = Vec::new();
        let enabled = match non_empty("DISCORD_NOTIFY_ENABLED") {
            None => true,
            Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
                warnings.push(format!(
                    "DISCORD_NOTIFY_ENABLED is not a boolean (value: {raw}); treating as enabled"
                ));
                true
            }),
        };

        let discord = if !enabled {
            None
        } else {
            non_empty("DISCORD_WEBHOOK_URL").and_then(|raw| match Url::parse(&raw) {
                Ok(webhook_url) => {
                    let min_level = match non_empty("DISCORD_NOTIFY_LEVEL") {
                        None => Level::ERROR,
                        Some(level) => parse_level(&level).unwrap_or_else(|| {
                            warnings.push(format!(
                                "DISCORD_NOTIFY_LEVEL is invalid (value: {level}); defaulting to ERROR"
                            ));
                            Level::ERROR
                        }),
                    };
                    Some(DiscordConfig {
                        webhook_url,
                        min_level,
                    })
                }
                Err(err) => {
                    // The URL embeds a credential, keep it out of the warning.
                    warnings.push(format!(
                        "DISCORD_WEBHOOK_URL is invalid; Discord alerts disabled ({err})"
                    ));
                    None
                }
            })
        };

        Self {
            service,
            discord,
            warnings,
        }
    }
}

fn parse_level(input: &str) -> Option<Level> {
    match input.trim().to_ascii_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

fn parse_bool(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> ObservabilityConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ObservabilityConfig::from_lookup("backend", |key| vars.get(key).cloned())
    }

    #[test]
    fn discord_is_off_without_a_webhook_url() {
        let config = config(&[]);
        assert!(config.discord.is_none());
        assert_eq!(config.service.service_name, "payments-backend");
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn invalid_webhook_url_warns_without_echoing_it() {
        let config = config(&[("DISCORD_WEBHOOK_URL", "not a url/secret-part")]);
        assert!(config.discord.is_none());
        assert_eq!(config.warnings.len(), 1);
        assert!(!config.warnings[0].contains("secret-part"));
    }

    #[test]
    fn level_defaults_to_error_and_can_be_lowered() {
        let url = "https://discord.com/api/webhooks/1/abc";
        let default = config(&[("DISCORD_WEBHOOK_URL", url)]);
        assert_eq!(default.discord.unwrap().min_level, Level::ERROR);

        let warn = config(&[("DISCORD_WEBHOOK_URL", url), ("DISCORD_NOTIFY_LEVEL", "warning")]);
        assert_eq!(warn.discord.unwrap().min_level, Level::WARN);

        let disabled = config(&[("DISCORD_WEBHOOK_URL", url), ("DISCORD_NOTIFY_ENABLED", "off")]);
        assert!(disabled.discord.is_none());
    }
}
