use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Client;
use serde_json::json;
use url::Url;

use super::notify_layer::{Alert, AlertSink};

const MESSAGE_LIMIT: usize = 2000;
const TRUNCATED_SUFFIX: &str = "\n... (truncated)";
/// Listed first so on-call sees which payment is affected.
const TRIAGE_FIELDS: [&str; 4] = ["payment_id", "gateway_id", "user_id", "job_id"];

pub(crate) struct DiscordSink {
    webhook_url: Url,
    client: Client,
}

impl DiscordSink {
    pub(crate) fn new(webhook_url: Url) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(3))
            .build()
            .context("failed to build discord http client")?;

        Ok(Self {
            webhook_url,
            client,
        })
    }
}

fn render(alert: &Alert) -> String {
    let mut lines = vec![format!(
        "**{}** `{}` `{}` `{}`",
        alert.service.service_name,
        alert.service.environment,
        alert.service.component,
        alert.level
    )];

    let mut origin = format!(
        "`{}` `{}`",
        alert.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        alert.target
    );
    if let Some(location) = &alert.location {
        origin.push_str(&format!(" `{location}`"));
    }
    lines.push(origin);

    if let Some(message) = alert.message.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        lines.push(format!("> {message}"));
    }
    if !alert.span_path.is_empty() {
        lines.push(format!("spans: `{}`", alert.span_path.join(" > ")));
    }

    let triage = TRIAGE_FIELDS
        .iter()
        .filter_map(|key| alert.fields.get(*key).map(|value| (*key, value)));
    let rest = alert
        .fields
        .iter()
        .filter(|(key, _)| !TRIAGE_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.as_str(), value));
    for (key, value) in triage.chain(rest) {
        lines.push(format!("- `{key}` = `{value}`"));
    }

    truncate(lines.join("\n"))
}

fn truncate(content: String) -> String {
    if content.chars().count() <= MESSAGE_LIMIT {
        return content;
    }
    let keep = MESSAGE_LIMIT - TRUNCATED_SUFFIX.chars().count();
    let mut truncated: String = content.chars().take(keep).collect();
    truncated.push_str(TRUNCATED_SUFFIX);
    truncated
}

#[async_trait]
impl AlertSink for DiscordSink {
    async fn deliver(&self, alert: &Alert) -> Result<()> {
        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(&json!({ "content": render(alert) }))
            .send()
            .await
            // reqwest errors include the URL, which carries the webhook credential.
            .map_err(|err| {
                if err.is_timeout() {
                    anyhow!("discord webhook request timed out")
                } else {
                    anyhow!("discord webhook request failed")
                }
            })?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "discord webhook returned status {}",
                response.status()
            ));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use tracing::Level;

    use super::*;
    use crate::observability::config::ServiceContext;

    fn alert(fields: &[(&str, &str)]) -> Alert {
        Alert {
            level: Level::ERROR,
            timestamp: Utc::now(),
            service: ServiceContext {
                service_name: "payments-backend".into(),
                environment: "test".into(),
                component: "backend".into(),
            },
            target: "backend::usecases::reconciler".into(),
            location: Some("reconciler.rs:10".into()),
            message: Some("reconciler: update failed".into()),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            span_path: vec![],
        }
    }

    #[test]
    fn triage_fields_come_before_the_rest() {
        let content = render(&alert(&[("attempt", "2"), ("payment_id", "p-1")]));
        let payment = content.find("payment_id").unwrap();
        let attempt = content.find("attempt").unwrap();
        assert!(payment < attempt);
        assert!(content.contains("> reconciler: update failed"));
    }

    #[test]
    fn long_messages_fit_discord_limit() {
        let long = "x".repeat(3000);
        let content = render(&alert(&[("detail", long.as_str())]));
        assert_eq!(content.chars().count(), MESSAGE_LIMIT);
        assert!(content.ends_with(TRUNCATED_SUFFIX));
    }
}
