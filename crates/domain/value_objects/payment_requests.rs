use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::domain::value_objects::{
    enums::{
        billing_periods::BillingPeriod, termination_modes::TerminationMode,
        three_ds_modes::ThreeDsMode,
    },
    saved_payment_methods::SavedPaymentMethodAttrs,
};

const MAX_TOKEN_ID_LEN: usize = 64;
const MAX_REASON_LEN: usize = 500;

#[derive(Debug, Clone, Error, PartialEq)]
#[error("{field}: {message}")]
pub struct RequestValidationError {
    pub field: &'static str,
    pub message: String,
}

impl RequestValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

type ValidationResult<T> = std::result::Result<T, RequestValidationError>;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateChargeRequest {
    #[serde(default)]
    pub transaction_token_id: Option<Value>,
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default)]
    pub capture_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "redirect_endpoint")]
    pub redirect: Option<String>,
    #[serde(default, alias = "three_ds_mode")]
    pub three_ds: Option<String>,
    #[serde(default)]
    pub payment_method: Option<SavedPaymentMethodAttrs>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChargeCommand {
    pub token_id: String,
    pub amount: i64,
    pub currency: String,
    pub metadata: Map<String, Value>,
    pub capture_at: Option<DateTime<Utc>>,
    pub redirect_endpoint: Option<String>,
    pub three_ds_mode: Option<ThreeDsMode>,
    pub payment_method: Option<SavedPaymentMethodAttrs>,
}

impl CreateChargeRequest {
    pub fn validate(self, default_currency: &str) -> ValidationResult<ChargeCommand> {
        Ok(ChargeCommand {
            token_id: coerce_token_id(self.transaction_token_id.as_ref())?,
            amount: positive_amount("amount", self.amount)?,
            currency: currency_or_default(self.currency, default_currency)?,
            metadata: self.metadata.unwrap_or_default(),
            capture_at: self.capture_at,
            redirect_endpoint: redirect_url(self.redirect)?,
            three_ds_mode: three_ds_mode(self.three_ds)?,
            payment_method: self.payment_method,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubscriptionRequest {
    #[serde(default)]
    pub transaction_token_id: Option<Value>,
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default, alias = "plan")]
    pub period: Option<String>,
    #[serde(default)]
    pub plan_id: Option<Uuid>,
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default)]
    pub initial_amount: Option<i64>,
    #[serde(default)]
    pub schedule_settings: Option<Value>,
    #[serde(default, alias = "redirect_endpoint")]
    pub redirect: Option<String>,
    #[serde(default, alias = "three_ds_mode")]
    pub three_ds: Option<String>,
    #[serde(default)]
    pub payment_method: Option<SavedPaymentMethodAttrs>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionCommand {
    pub token_id: String,
    pub amount: i64,
    pub currency: String,
    pub period: BillingPeriod,
    pub plan_id: Option<Uuid>,
    pub metadata: Map<String, Value>,
    pub initial_amount: Option<i64>,
    pub schedule_settings: Option<Value>,
    pub redirect_endpoint: Option<String>,
    pub three_ds_mode: Option<ThreeDsMode>,
    pub payment_method: Option<SavedPaymentMethodAttrs>,
}

impl CreateSubscriptionRequest {
    pub fn validate(self, default_currency: &str) -> ValidationResult<SubscriptionCommand> {
        let period = match self.period.as_deref() {
            None => return Err(RequestValidationError::new("period", "is required")),
            Some(raw) => BillingPeriod::from_str(raw).ok_or_else(|| {
                RequestValidationError::new("period", format!("unsupported billing period `{raw}`"))
            })?,
        };
        let initial_amount = match self.initial_amount {
            Some(value) if value < 0 => {
                return Err(RequestValidationError::new(
                    "initial_amount",
                    "must not be negative",
                ));
            }
            other => other,
        };
        if let Some(settings) = &self.schedule_settings {
            if !settings.is_object() {
                return Err(RequestValidationError::new(
                    "schedule_settings",
                    "must be an object",
                ));
            }
        }

        Ok(SubscriptionCommand {
            token_id: coerce_token_id(self.transaction_token_id.as_ref())?,
            amount: positive_amount("amount", self.amount)?,
            currency: currency_or_default(self.currency, default_currency)?,
            period,
            plan_id: self.plan_id,
            metadata: self.metadata.unwrap_or_default(),
            initial_amount,
            schedule_settings: self.schedule_settings,
            redirect_endpoint: redirect_url(self.redirect)?,
            three_ds_mode: three_ds_mode(self.three_ds)?,
            payment_method: self.payment_method,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelSubscriptionRequest {
    #[serde(default)]
    pub subscription_id: Option<Uuid>,
    #[serde(default)]
    pub termination_mode: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CancelSubscriptionCommand {
    pub subscription_id: Option<Uuid>,
    pub termination_mode: TerminationMode,
    pub reason: Option<String>,
}

impl CancelSubscriptionRequest {
    pub fn validate(self) -> ValidationResult<CancelSubscriptionCommand> {
        let termination_mode = match self.termination_mode.as_deref() {
            None => TerminationMode::default(),
            Some(raw) => TerminationMode::from_str(raw).ok_or_else(|| {
                RequestValidationError::new(
                    "termination_mode",
                    "must be `immediate` or `on_next_payment`",
                )
            })?,
        };

        Ok(CancelSubscriptionCommand {
            subscription_id: self.subscription_id,
            termination_mode,
            reason: reason(self.reason)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefundChargeRequest {
    #[serde(default)]
    pub charge_id: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// `charge_id` is either the gateway charge id or the local payment id.
#[derive(Debug, Clone, PartialEq)]
pub struct RefundChargeCommand {
    pub charge_id: String,
    pub amount: Option<i64>,
    pub reason: Option<String>,
}

impl RefundChargeRequest {
    pub fn validate(self) -> ValidationResult<RefundChargeCommand> {
        let charge_id = self
            .charge_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| RequestValidationError::new("charge_id", "is required"))?;
        let amount = match self.amount {
            Some(amount) => Some(positive_amount("amount", Some(amount))?),
            None => None,
        };

        Ok(RefundChargeCommand {
            charge_id,
            amount,
            reason: reason(self.reason)?,
        })
    }
}

/// Accepts a bare token id or an object carrying `id`, `token_id` or
/// `univapayTokenId`.
pub fn coerce_token_id(value: Option<&Value>) -> ValidationResult<String> {
    let candidate = match value {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text.clone()),
        Some(Value::Object(object)) => ["id", "token_id", "univapayTokenId"]
            .iter()
            .filter_map(|key| object.get(*key))
            .find(|inner| !inner.is_null())
            .map(|inner| match inner {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            }),
        Some(other) => Some(other.to_string()),
    };

    let token_id = candidate.unwrap_or_default().trim().to_string();
    if token_id.is_empty() {
        return Err(RequestValidationError::new(
            "transaction_token_id",
            "is required",
        ));
    }
    if token_id.len() > MAX_TOKEN_ID_LEN {
        return Err(RequestValidationError::new(
            "transaction_token_id",
            format!("must be at most {MAX_TOKEN_ID_LEN} characters"),
        ));
    }
    Ok(token_id)
}

fn positive_amount(field: &'static str, amount: Option<i64>) -> ValidationResult<i64> {
    match amount {
        None => Err(RequestValidationError::new(field, "is required")),
        Some(value) if value < 1 => Err(RequestValidationError::new(
            field,
            "must be at least 1",
        )),
        Some(value) => Ok(value),
    }
}

fn currency_or_default(currency: Option<String>, default_currency: &str) -> ValidationResult<String> {
    let currency = currency
        .map(|code| code.trim().to_ascii_uppercase())
        .filter(|code| !code.is_empty())
        .unwrap_or_else(|| default_currency.to_ascii_uppercase());
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(RequestValidationError::new(
            "currency",
            "must be a 3-letter currency code",
        ));
    }
    Ok(currency)
}

fn redirect_url(redirect: Option<String>) -> ValidationResult<Option<String>> {
    let Some(raw) = redirect.map(|r| r.trim().to_string()).filter(|r| !r.is_empty()) else {
        return Ok(None);
    };
    match Url::parse(&raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Some(raw)),
        _ => Err(RequestValidationError::new(
            "redirect",
            "must be an absolute http(s) URL",
        )),
    }
}

fn three_ds_mode(raw: Option<String>) -> ValidationResult<Option<ThreeDsMode>> {
    match raw.as_deref() {
        None => Ok(None),
        Some(value) => ThreeDsMode::from_str(value).map(Some).ok_or_else(|| {
            RequestValidationError::new(
                "three_ds",
                "must be one of normal, require, force, skip",
            )
        }),
    }
}

fn reason(reason: Option<String>) -> ValidationResult<Option<String>> {
    let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
    if reason.as_ref().is_some_and(|r| r.chars().count() > MAX_REASON_LEN) {
        return Err(RequestValidationError::new(
            "reason",
            format!("must be at most {MAX_REASON_LEN} characters"),
        ));
    }
    Ok(reason)
}
