use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use crate::domain::repositories::notifier::{PaymentNotice, PaymentNoticeKind, PaymentNotifier};

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct EmailApiConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: Vec<&'a str>,
    subject: &'a str,
    text: String,
}

/// Sends payment notices through a Resend-style HTTP email API.
///
/// Without an API configuration notices are only logged.
pub struct HttpEmailNotifier {
    client: Client,
    config: Option<EmailApiConfig>,
}

impl HttpEmailNotifier {
    pub fn new(config: Option<EmailApiConfig>) -> Result<Self> {
        let client = Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .context("failed to build email http client")?;

        Ok(Self { client, config })
    }
}

fn body_for(notice: &PaymentNotice) -> String {
    let reference = notice
        .gateway_id
        .as_deref()
        .map(|id| format!(" (reference {id})"))
        .unwrap_or_default();
    match notice.kind {
        PaymentNoticeKind::SubscriptionCancelled => format!(
            "Your subscription{reference} has been cancelled. Premium features stay available until the end of the current billing period."
        ),
        PaymentNoticeKind::SubscriptionCompleted => {
            format!("Your subscription{reference} has completed its billing schedule.")
        }
    }
}

#[async_trait]
impl PaymentNotifier for HttpEmailNotifier {
    async fn send_notice(&self, notice: PaymentNotice) -> Result<()> {
        let Some(config) = self.config.as_ref() else {
            info!(
                user_id = %notice.user_id,
                payment_id = %notice.payment_id,
                kind = ?notice.kind,
                "email: delivery disabled, notice skipped"
            );
            return Ok(());
        };
        let Some(recipient) = notice.recipient.as_deref() else {
            warn!(
                user_id = %notice.user_id,
                payment_id = %notice.payment_id,
                "email: no recipient address recorded, notice skipped"
            );
            return Ok(());
        };

        let request = SendEmailRequest {
            from: &config.from,
            to: vec![recipient],
            subject: notice.kind.subject(),
            text: body_for(&notice),
        };

        let response = self
            .client
            .post(&config.api_url)
            .bearer_auth(&config.api_key)
            .json(&request)
            .send()
            .await
            .context("email api request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("email api returned {status}: {body}");
        }

        info!(
            user_id = %notice.user_id,
            payment_id = %notice.payment_id,
            kind = ?notice.kind,
            "email: notice sent"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn notice(kind: PaymentNoticeKind, recipient: Option<&str>) -> PaymentNotice {
        PaymentNotice {
            user_id: Uuid::new_v4(),
            recipient: recipient.map(str::to_string),
            kind,
            payment_id: Uuid::new_v4(),
            gateway_id: Some("sub_1".into()),
        }
    }

    #[test]
    fn body_mentions_gateway_reference() {
        let body = body_for(&notice(PaymentNoticeKind::SubscriptionCancelled, None));
        assert!(body.contains("sub_1"));
        assert!(body.contains("cancelled"));
    }

    #[tokio::test]
    async fn disabled_notifier_accepts_notices() {
        let notifier = HttpEmailNotifier::new(None).unwrap();
        let result = notifier
            .send_notice(notice(
                PaymentNoticeKind::SubscriptionCompleted,
                Some("user@example.com"),
            ))
            .await;
        assert!(result.is_ok());
    }
}
