use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode, header::AUTHORIZATION};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Status reported for failures that never produced an HTTP response.
pub const TRANSPORT_FAILURE_STATUS: u16 = 500;

#[derive(Debug, Clone, Error, PartialEq)]
#[error("gateway request failed with status {status}: {body}")]
pub struct GatewayError {
    pub status: u16,
    pub body: String,
}

impl GatewayError {
    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND.as_u16()
    }

    fn transport(err: reqwest::Error) -> Self {
        Self {
            status: TRANSPORT_FAILURE_STATUS,
            body: err.without_url().to_string(),
        }
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, Clone)]
pub struct GatewayClientConfig {
    pub base_url: String,
    pub app_secret: String,
    pub app_token: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize)]
struct ThreeDsOptions<'a> {
    mode: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct RedirectOptions<'a> {
    endpoint: &'a str,
}

#[derive(Debug, Clone, Default)]
pub struct ChargeParams {
    pub transaction_token_id: String,
    pub amount: i64,
    pub currency: String,
    pub capture: bool,
    pub capture_at: Option<String>,
    pub metadata: Map<String, Value>,
    pub three_ds_mode: Option<String>,
    pub redirect_endpoint: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SubscriptionParams {
    pub transaction_token_id: String,
    pub amount: i64,
    pub currency: String,
    pub period: String,
    pub initial_amount: Option<i64>,
    pub schedule_settings: Option<Value>,
    pub metadata: Map<String, Value>,
    pub three_ds_mode: Option<String>,
    pub redirect_endpoint: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RefundParams {
    pub amount: i64,
    pub currency: String,
    pub reason: Option<String>,
    pub metadata: Map<String, Value>,
}

#[derive(Serialize)]
struct ChargeBody<'a> {
    transaction_token_id: &'a str,
    amount: i64,
    currency: &'a str,
    capture: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    capture_at: Option<&'a str>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    metadata: &'a Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    three_ds: Option<ThreeDsOptions<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect: Option<RedirectOptions<'a>>,
}

impl ChargeParams {
    fn body(&self) -> ChargeBody<'_> {
        ChargeBody {
            transaction_token_id: &self.transaction_token_id,
            amount: self.amount,
            currency: &self.currency,
            capture: self.capture,
            capture_at: self.capture_at.as_deref(),
            metadata: &self.metadata,
            three_ds: self.three_ds_mode.as_deref().map(|mode| ThreeDsOptions { mode }),
            redirect: self
                .redirect_endpoint
                .as_deref()
                .map(|endpoint| RedirectOptions { endpoint }),
        }
    }
}

#[derive(Serialize)]
struct SubscriptionBody<'a> {
    transaction_token_id: &'a str,
    amount: i64,
    currency: &'a str,
    period: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    initial_amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schedule_settings: Option<&'a Value>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    metadata: &'a Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    three_ds: Option<ThreeDsOptions<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect: Option<RedirectOptions<'a>>,
}

impl SubscriptionParams {
    fn body(&self) -> SubscriptionBody<'_> {
        SubscriptionBody {
            transaction_token_id: &self.transaction_token_id,
            amount: self.amount,
            currency: &self.currency,
            period: &self.period,
            initial_amount: self.initial_amount,
            schedule_settings: self.schedule_settings.as_ref(),
            metadata: &self.metadata,
            three_ds: self.three_ds_mode.as_deref().map(|mode| ThreeDsOptions { mode }),
            redirect: self
                .redirect_endpoint
                .as_deref()
                .map(|endpoint| RedirectOptions { endpoint }),
        }
    }
}

#[derive(Serialize)]
struct RefundBody<'a> {
    amount: i64,
    currency: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'a str>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    metadata: &'a Map<String, Value>,
}

#[derive(Serialize)]
struct CancelBody<'a> {
    termination_mode: &'a str,
}

/// HTTP wrapper around the payment gateway API.
///
/// Responses are returned as raw JSON documents. The client never retries;
/// callers that retry a mutating call pass the same idempotency key again.
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    authorization: String,
}

impl GatewayClient {
    pub fn new(config: GatewayClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build gateway http client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            authorization: format!("Bearer {}.{}", config.app_secret, config.app_token),
        })
    }

    pub fn new_idempotency_key() -> String {
        Uuid::new_v4().to_string()
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        idempotency_key: Option<&str>,
    ) -> GatewayResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(AUTHORIZATION, &self.authorization);
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|err| {
            let failure = GatewayError::transport(err);
            warn!(%method, path, error = %failure.body, "gateway: transport failure");
            failure
        })?;

        let status = response.status();
        let text = response.text().await.map_err(GatewayError::transport)?;

        if !status.is_success() {
            warn!(%method, path, status = status.as_u16(), "gateway: request rejected");
            return Err(GatewayError {
                status: status.as_u16(),
                body: text,
            });
        }

        debug!(%method, path, status = status.as_u16(), "gateway: request succeeded");
        if text.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        serde_json::from_str(&text).map_err(|err| GatewayError {
            status: TRANSPORT_FAILURE_STATUS,
            body: format!("invalid gateway response body: {err}"),
        })
    }

    pub async fn create_charge(
        &self,
        params: &ChargeParams,
        idempotency_key: &str,
    ) -> GatewayResult<Value> {
        self.send(Method::POST, "/charges", Some(&params.body()), Some(idempotency_key))
            .await
    }

    pub async fn get_charge(&self, charge_id: &str) -> GatewayResult<Value> {
        self.send::<Value>(Method::GET, &format!("/charges/{charge_id}"), None, None)
            .await
    }

    pub async fn create_subscription(
        &self,
        params: &SubscriptionParams,
        idempotency_key: &str,
    ) -> GatewayResult<Value> {
        self.send(
            Method::POST,
            "/subscriptions",
            Some(&params.body()),
            Some(idempotency_key),
        )
        .await
    }

    pub async fn get_subscription(&self, subscription_id: &str) -> GatewayResult<Value> {
        self.send::<Value>(
            Method::GET,
            &format!("/subscriptions/{subscription_id}"),
            None,
            None,
        )
        .await
    }

    pub async fn cancel_subscription(
        &self,
        subscription_id: &str,
        termination_mode: &str,
    ) -> GatewayResult<Value> {
        self.send(
            Method::POST,
            &format!("/subscriptions/{subscription_id}/cancel"),
            Some(&CancelBody { termination_mode }),
            None,
        )
        .await
    }

    pub async fn refund_charge(
        &self,
        charge_id: &str,
        params: &RefundParams,
        idempotency_key: &str,
    ) -> GatewayResult<Value> {
        let body = RefundBody {
            amount: params.amount,
            currency: &params.currency,
            reason: params.reason.as_deref(),
            metadata: &params.metadata,
        };
        self.send(
            Method::POST,
            &format!("/charges/{charge_id}/refunds"),
            Some(&body),
            Some(idempotency_key),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn client() -> GatewayClient {
        GatewayClient::new(GatewayClientConfig {
            base_url: "https://gateway.test/".into(),
            app_secret: "secret".into(),
            app_token: "token".into(),
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[test]
    fn authorization_joins_secret_and_token() {
        let client = client();
        assert_eq!(client.authorization, "Bearer secret.token");
        assert_eq!(client.base_url, "https://gateway.test");
    }

    #[test]
    fn charge_body_omits_unset_options() {
        let params = ChargeParams {
            transaction_token_id: "tok_1".into(),
            amount: 1000,
            currency: "JPY".into(),
            capture: true,
            ..Default::default()
        };

        let body = serde_json::to_value(params.body()).unwrap();
        assert_eq!(
            body,
            json!({
                "transaction_token_id": "tok_1",
                "amount": 1000,
                "currency": "JPY",
                "capture": true
            })
        );
    }

    #[test]
    fn subscription_body_nests_three_ds_and_redirect() {
        let params = SubscriptionParams {
            transaction_token_id: "tok_1".into(),
            amount: 980,
            currency: "JPY".into(),
            period: "monthly".into(),
            three_ds_mode: Some("require".into()),
            redirect_endpoint: Some("https://example.com/back".into()),
            ..Default::default()
        };

        let body = serde_json::to_value(params.body()).unwrap();
        assert_eq!(body["three_ds"], json!({ "mode": "require" }));
        assert_eq!(body["redirect"], json!({ "endpoint": "https://example.com/back" }));
        assert_eq!(body["period"], "monthly");
        assert!(body.get("metadata").is_none());
    }

    #[test]
    fn idempotency_keys_are_fresh() {
        assert_ne!(
            GatewayClient::new_idempotency_key(),
            GatewayClient::new_idempotency_key()
        );
    }

    #[tokio::test]
    async fn unreachable_gateway_maps_to_synthetic_status() {
        let client = GatewayClient::new(GatewayClientConfig {
            base_url: "http://127.0.0.1:9".into(),
            app_secret: "s".into(),
            app_token: "t".into(),
            timeout: Duration::from_millis(500),
        })
        .unwrap();

        let err = client.get_charge("ch_1").await.unwrap_err();
        assert_eq!(err.status, TRANSPORT_FAILURE_STATUS);
        assert!(!err.is_not_found());
    }
}
