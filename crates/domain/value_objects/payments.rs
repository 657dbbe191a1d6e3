use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::entities::payments::PaymentEntity;

/// How the `None` fields of a [`StatusUpdate`] are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusUpdateKind {
    /// A local transition (cancel, refund). `None` keeps the stored value.
    #[default]
    Transition,
    /// A gateway snapshot. The status-correlated columns take the observed
    /// values and `None` clears them. `refunded_amount` and
    /// `termination_mode` are local bookkeeping and are never touched.
    Observation,
}

/// New status for a payment plus the columns that move with it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusUpdate {
    pub kind: StatusUpdateKind,
    pub status: String,
    pub charged_amount: Option<i64>,
    pub charged_currency: Option<String>,
    pub fee_amount: Option<i64>,
    pub fee_currency: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub error_detail: Option<String>,
    pub refunded_amount: Option<i64>,
    pub next_payment_id: Option<String>,
    pub next_payment_due_date: Option<NaiveDate>,
    pub next_payment_amount: Option<i64>,
    pub cancelled_on: Option<DateTime<Utc>>,
    pub termination_mode: Option<String>,
    pub raw_json: Option<Value>,
}

impl StatusUpdate {
    pub fn status_only(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            ..Default::default()
        }
    }

    /// A gateway snapshot carrying only a status. Stored errors and
    /// next-payment details are cleared when it is applied.
    pub fn observed(status: impl Into<String>) -> Self {
        Self {
            kind: StatusUpdateKind::Observation,
            status: status.into(),
            ..Default::default()
        }
    }
}

/// Result of inserting a payment row.
#[derive(Debug, Clone)]
pub enum CreatePaymentOutcome {
    Created(PaymentEntity),
    /// A recurring payment was refused because the owner already holds an
    /// active subscription.
    ActiveSubscriptionExists(PaymentEntity),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentSummary {
    pub id: Uuid,
    pub payment_type: String,
    pub status: String,
    pub gateway_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub period: Option<String>,
    pub next_payment_due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

impl From<&PaymentEntity> for PaymentSummary {
    fn from(value: &PaymentEntity) -> Self {
        Self {
            id: value.id,
            payment_type: value.payment_type.clone(),
            status: value.status.clone(),
            gateway_id: value.gateway_id.clone(),
            amount: value.amount,
            currency: value.currency.clone(),
            period: value.period.clone(),
            next_payment_due_date: value.next_payment_due_date,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PaymentCommonDto {
    pub id: Uuid,
    pub status: String,
    pub gateway_id: Option<String>,
    pub store_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub mode: String,
    pub saved_payment_method_id: Option<Uuid>,
    pub plan_id: Option<Uuid>,
    pub metadata: Value,
    pub created_on: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChargeDetailsDto {
    pub charged_amount: Option<i64>,
    pub charged_currency: Option<String>,
    pub fee_amount: Option<i64>,
    pub fee_currency: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub error_detail: Option<String>,
    pub capture_at: Option<DateTime<Utc>>,
    pub redirect_endpoint: Option<String>,
    pub redirect_id: Option<String>,
    pub three_ds_mode: Option<String>,
    pub three_ds_redirect_endpoint: Option<String>,
    pub three_ds_redirect_id: Option<String>,
    pub refunded_amount: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscriptionDetailsDto {
    pub period: Option<String>,
    pub initial_amount: Option<i64>,
    pub schedule_settings: Option<Value>,
    pub next_payment_id: Option<String>,
    pub next_payment_due_date: Option<NaiveDate>,
    pub next_payment_amount: Option<i64>,
    pub cancelled_on: Option<DateTime<Utc>>,
    pub termination_mode: Option<String>,
}

/// API view of a payment row, shaped by its payment type.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "payment_type", rename_all = "snake_case")]
pub enum PaymentDto {
    OneTime {
        #[serde(flatten)]
        common: PaymentCommonDto,
        #[serde(flatten)]
        charge: ChargeDetailsDto,
    },
    Recurring {
        #[serde(flatten)]
        common: PaymentCommonDto,
        #[serde(flatten)]
        subscription: SubscriptionDetailsDto,
    },
}

impl From<PaymentEntity> for PaymentDto {
    fn from(value: PaymentEntity) -> Self {
        let recurring = value.payment_type == "recurring";
        let common = PaymentCommonDto {
            id: value.id,
            status: value.status,
            gateway_id: value.gateway_id,
            store_id: value.store_id,
            amount: value.amount,
            currency: value.currency,
            mode: value.mode,
            saved_payment_method_id: value.saved_payment_method_id,
            plan_id: value.plan_id,
            metadata: value.metadata,
            created_on: value.created_on,
            created_at: value.created_at,
            updated_at: value.updated_at,
        };

        if recurring {
            PaymentDto::Recurring {
                common,
                subscription: SubscriptionDetailsDto {
                    period: value.period,
                    initial_amount: value.initial_amount,
                    schedule_settings: value.schedule_settings,
                    next_payment_id: value.next_payment_id,
                    next_payment_due_date: value.next_payment_due_date,
                    next_payment_amount: value.next_payment_amount,
                    cancelled_on: value.cancelled_on,
                    termination_mode: value.termination_mode,
                },
            }
        } else {
            PaymentDto::OneTime {
                common,
                charge: ChargeDetailsDto {
                    charged_amount: value.charged_amount,
                    charged_currency: value.charged_currency,
                    fee_amount: value.fee_amount,
                    fee_currency: value.fee_currency,
                    error_code: value.error_code,
                    error_message: value.error_message,
                    error_detail: value.error_detail,
                    capture_at: value.capture_at,
                    redirect_endpoint: value.redirect_endpoint,
                    redirect_id: value.redirect_id,
                    three_ds_mode: value.three_ds_mode,
                    three_ds_redirect_endpoint: value.three_ds_redirect_endpoint,
                    three_ds_redirect_id: value.three_ds_redirect_id,
                    refunded_amount: value.refunded_amount,
                },
            }
        }
    }
}
