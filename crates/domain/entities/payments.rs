use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::value_objects::payments::{StatusUpdate, StatusUpdateKind};
use crate::infra::db::postgres::schema::payments;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = payments)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub payment_type: String,
    pub status: String,
    pub gateway_id: Option<String>,
    pub store_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub mode: String,
    pub saved_payment_method_id: Option<Uuid>,
    pub plan_id: Option<Uuid>,
    pub metadata: Value,
    pub raw_json: Value,
    pub created_on: Option<DateTime<Utc>>,
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
    pub period: Option<String>,
    pub initial_amount: Option<i64>,
    pub schedule_settings: Option<Value>,
    pub next_payment_id: Option<String>,
    pub next_payment_due_date: Option<NaiveDate>,
    pub next_payment_amount: Option<i64>,
    pub cancelled_on: Option<DateTime<Utc>>,
    pub termination_mode: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Insertable)]
#[diesel(table_name = payments)]
pub struct InsertPaymentEntity {
    pub user_id: Uuid,
    pub payment_type: String,
    pub status: String,
    pub gateway_id: Option<String>,
    pub store_id: Option<String>,
    pub amount: i64,
    pub currency: String,
    pub mode: String,
    pub saved_payment_method_id: Option<Uuid>,
    pub plan_id: Option<Uuid>,
    pub metadata: Value,
    pub raw_json: Value,
    pub created_on: Option<DateTime<Utc>>,
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
    pub period: Option<String>,
    pub initial_amount: Option<i64>,
    pub schedule_settings: Option<Value>,
    pub next_payment_id: Option<String>,
    pub next_payment_due_date: Option<NaiveDate>,
    pub next_payment_amount: Option<i64>,
}

/// Partial write for local transitions. `None` columns are left as stored.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = payments)]
pub struct PaymentStatusChangeset {
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
    pub updated_at: DateTime<Utc>,
}

impl From<StatusUpdate> for PaymentStatusChangeset {
    fn from(value: StatusUpdate) -> Self {
        Self {
            status: value.status,
            charged_amount: value.charged_amount,
            charged_currency: value.charged_currency,
            fee_amount: value.fee_amount,
            fee_currency: value.fee_currency,
            error_code: value.error_code,
            error_message: value.error_message,
            error_detail: value.error_detail,
            refunded_amount: value.refunded_amount,
            next_payment_id: value.next_payment_id,
            next_payment_due_date: value.next_payment_due_date,
            next_payment_amount: value.next_payment_amount,
            cancelled_on: value.cancelled_on,
            termination_mode: value.termination_mode,
            raw_json: value.raw_json,
            updated_at: Utc::now(),
        }
    }
}

/// Write for gateway observations. The status-correlated columns are replaced
/// outright, so `None` stores NULL.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = payments, treat_none_as_null = true)]
pub struct PaymentObservationChangeset {
    pub status: String,
    pub charged_amount: Option<i64>,
    pub charged_currency: Option<String>,
    pub fee_amount: Option<i64>,
    pub fee_currency: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub error_detail: Option<String>,
    pub next_payment_id: Option<String>,
    pub next_payment_due_date: Option<NaiveDate>,
    pub next_payment_amount: Option<i64>,
    pub cancelled_on: Option<DateTime<Utc>>,
}

/// Companion of [`PaymentObservationChangeset`]: the raw document is only
/// replaced when the observation carried one.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = payments)]
pub struct PaymentSnapshotChangeset {
    pub raw_json: Option<Value>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentObservationChangeset {
    pub fn split(update: StatusUpdate) -> (Self, PaymentSnapshotChangeset) {
        let observed = Self {
            status: update.status,
            charged_amount: update.charged_amount,
            charged_currency: update.charged_currency,
            fee_amount: update.fee_amount,
            fee_currency: update.fee_currency,
            error_code: update.error_code,
            error_message: update.error_message,
            error_detail: update.error_detail,
            next_payment_id: update.next_payment_id,
            next_payment_due_date: update.next_payment_due_date,
            next_payment_amount: update.next_payment_amount,
            cancelled_on: update.cancelled_on,
        };
        let snapshot = PaymentSnapshotChangeset {
            raw_json: update.raw_json,
            updated_at: Utc::now(),
        };
        (observed, snapshot)
    }
}

impl PaymentEntity {
    /// Applies a status update in memory with the same column semantics as
    /// [`PaymentStatusChangeset`] and [`PaymentObservationChangeset`].
    pub fn merge_status_update(&mut self, update: StatusUpdate) {
        if update.kind == StatusUpdateKind::Observation {
            let (observed, snapshot) = PaymentObservationChangeset::split(update);
            self.status = observed.status;
            self.charged_amount = observed.charged_amount;
            self.charged_currency = observed.charged_currency;
            self.fee_amount = observed.fee_amount;
            self.fee_currency = observed.fee_currency;
            self.error_code = observed.error_code;
            self.error_message = observed.error_message;
            self.error_detail = observed.error_detail;
            self.next_payment_id = observed.next_payment_id;
            self.next_payment_due_date = observed.next_payment_due_date;
            self.next_payment_amount = observed.next_payment_amount;
            self.cancelled_on = observed.cancelled_on;
            if let Some(raw_json) = snapshot.raw_json {
                self.raw_json = raw_json;
            }
            self.updated_at = snapshot.updated_at;
            return;
        }

        self.status = update.status;
        overwrite(&mut self.charged_amount, update.charged_amount);
        overwrite(&mut self.charged_currency, update.charged_currency);
        overwrite(&mut self.fee_amount, update.fee_amount);
        overwrite(&mut self.fee_currency, update.fee_currency);
        overwrite(&mut self.error_code, update.error_code);
        overwrite(&mut self.error_message, update.error_message);
        overwrite(&mut self.error_detail, update.error_detail);
        overwrite(&mut self.refunded_amount, update.refunded_amount);
        overwrite(&mut self.next_payment_id, update.next_payment_id);
        overwrite(&mut self.next_payment_due_date, update.next_payment_due_date);
        overwrite(&mut self.next_payment_amount, update.next_payment_amount);
        overwrite(&mut self.cancelled_on, update.cancelled_on);
        overwrite(&mut self.termination_mode, update.termination_mode);
        if let Some(raw_json) = update.raw_json {
            self.raw_json = raw_json;
        }
        self.updated_at = Utc::now();
    }
}

fn overwrite<T>(slot: &mut Option<T>, observed: Option<T>) {
    if observed.is_some() {
        *slot = observed;
    }
}
