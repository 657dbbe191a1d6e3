use std::{str::FromStr, time::Duration};

use anyhow::{Context, Result, anyhow};
use crates::{
    domain::value_objects::enums::payment_modes::PaymentMode,
    infra::email::http_notifier::EmailApiConfig,
    payments::gateway_client::GatewayClientConfig,
};

use super::config_model::{AuthSecret, BackendServer, Database, DotEnvyConfig, Gateway, Poll};
use crate::usecases::payments::PaymentSettings;

const DEFAULT_GATEWAY_BASE_URL: &str = "https://api.univapay.com";

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: parse_required("SERVER_PORT_BACKEND")?,
        body_limit: parse_required("SERVER_BODY_LIMIT")?,
        timeout: parse_required("SERVER_TIMEOUT")?,
    };

    Ok(DotEnvyConfig {
        backend_server,
        database: load_database()?,
        auth: get_auth_secret()?,
        gateway: load_gateway()?,
        poll: load_poll()?,
        payments: load_payments()?,
        email: load_email(),
    })
}

pub fn load_database() -> Result<Database> {
    Ok(Database {
        url: required("DATABASE_URL")?,
    })
}

pub fn get_auth_secret() -> Result<AuthSecret> {
    dotenvy::dotenv().ok();

    Ok(AuthSecret {
        jwt_secret: required("JWT_SECRET")?,
    })
}

pub fn load_gateway() -> Result<Gateway> {
    let client = GatewayClientConfig {
        base_url: optional("GATEWAY_BASE_URL")
            .unwrap_or_else(|| DEFAULT_GATEWAY_BASE_URL.to_string()),
        app_secret: required("GATEWAY_APP_SECRET")?,
        app_token: required("GATEWAY_APP_TOKEN")?,
        timeout: Duration::from_secs(parse_or("GATEWAY_TIMEOUT_SECONDS", 15)?),
    };

    Ok(Gateway {
        client,
        webhook_secret: optional("GATEWAY_WEBHOOK_SECRET"),
    })
}

pub fn load_poll() -> Result<Poll> {
    Ok(Poll {
        after_seconds: parse_or("POLL_AFTER_SECONDS", 30)?,
        retry_after_seconds: parse_or("POLL_RETRY_AFTER_SECONDS", 60)?,
        fallback_enabled: match optional("ENABLE_POLL_FALLBACK") {
            Some(raw) => parse_flag(&raw).context("ENABLE_POLL_FALLBACK is invalid")?,
            None => true,
        },
    })
}

pub fn load_payments() -> Result<PaymentSettings> {
    let mode = match optional("PAYMENT_MODE") {
        Some(raw) => PaymentMode::from_str(&raw)
            .ok_or_else(|| anyhow!("PAYMENT_MODE must be `test` or `live`, got `{raw}`"))?,
        None => PaymentMode::default(),
    };

    Ok(PaymentSettings {
        mode,
        default_currency: optional("DEFAULT_CURRENCY")
            .map(|currency| currency.to_ascii_uppercase())
            .unwrap_or_else(|| "JPY".to_string()),
        premium_features: optional("PREMIUM_FEATURES")
            .map(|raw| split_list(&raw))
            .unwrap_or_default(),
    })
}

/// Notices are skipped when any email variable is missing.
pub fn load_email() -> Option<EmailApiConfig> {
    Some(EmailApiConfig {
        api_url: optional("EMAIL_API_URL")?,
        api_key: optional("EMAIL_API_KEY")?,
        from: optional("EMAIL_FROM")?,
    })
}

fn required(key: &str) -> Result<String> {
    optional(key).with_context(|| format!("{key} is invalid"))
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_required<T>(key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    required(key)?
        .parse()
        .with_context(|| format!("{key} is invalid"))
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        Some(raw) => raw.parse().with_context(|| format!("{key} is invalid")),
        None => Ok(default),
    }
}

pub(crate) fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("`{other}` is not a boolean")),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        assert!(parse_flag("TRUE").unwrap());
        assert!(parse_flag(" on ").unwrap());
        assert!(!parse_flag("0").unwrap());
        assert!(parse_flag("maybe").is_err());
    }

    #[test]
    fn feature_lists_drop_blanks() {
        assert_eq!(
            split_list("hd_export, ad_free,,  "),
            vec!["hd_export".to_string(), "ad_free".to_string()]
        );
        assert!(split_list("").is_empty());
    }
}
