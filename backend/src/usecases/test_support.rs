//! In-memory repository doubles and fixtures for use-case tests.

use std::sync::{
    Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use crates::domain::{
    entities::{
        payments::{InsertPaymentEntity, PaymentEntity},
        saved_payment_methods::SavedPaymentMethodEntity,
    },
    repositories::{
        payments::PaymentRepository, saved_payment_methods::SavedPaymentMethodRepository,
    },
    value_objects::{
        enums::{payment_statuses::ACTIVE_SUBSCRIPTION_STATUSES, payment_types::PaymentType},
        payments::{CreatePaymentOutcome, StatusUpdate},
        saved_payment_methods::SavedPaymentMethodAttrs,
    },
};
use serde_json::json;
use uuid::Uuid;

pub fn sample_subscription(user_id: Uuid, status: &str) -> PaymentEntity {
    let now = Utc::now();
    let mut payment = sample_payment(user_id, PaymentType::Recurring, status, 1980);
    payment.gateway_id = Some(format!("sub_{}", Uuid::new_v4().simple()));
    payment.period = Some("monthly".into());
    payment.next_payment_due_date = Some((now + Duration::days(30)).date_naive());
    payment
}

pub fn sample_charge(user_id: Uuid, status: &str, amount: i64) -> PaymentEntity {
    let mut payment = sample_payment(user_id, PaymentType::OneTime, status, amount);
    payment.gateway_id = Some(format!("ch_{}", Uuid::new_v4().simple()));
    payment
}

fn sample_payment(
    user_id: Uuid,
    payment_type: PaymentType,
    status: &str,
    amount: i64,
) -> PaymentEntity {
    entity_from_insert(InsertPaymentEntity {
        user_id,
        payment_type: payment_type.as_str().into(),
        status: status.into(),
        amount,
        currency: "JPY".into(),
        mode: "test".into(),
        metadata: json!({}),
        raw_json: json!({}),
        ..Default::default()
    })
}

fn entity_from_insert(row: InsertPaymentEntity) -> PaymentEntity {
    let now = Utc::now();
    PaymentEntity {
        id: Uuid::new_v4(),
        user_id: row.user_id,
        payment_type: row.payment_type,
        status: row.status,
        gateway_id: row.gateway_id,
        store_id: row.store_id,
        amount: row.amount,
        currency: row.currency,
        mode: row.mode,
        saved_payment_method_id: row.saved_payment_method_id,
        plan_id: row.plan_id,
        metadata: row.metadata,
        raw_json: row.raw_json,
        created_on: row.created_on,
        charged_amount: row.charged_amount,
        charged_currency: row.charged_currency,
        fee_amount: row.fee_amount,
        fee_currency: row.fee_currency,
        error_code: row.error_code,
        error_message: row.error_message,
        error_detail: row.error_detail,
        capture_at: row.capture_at,
        redirect_endpoint: row.redirect_endpoint,
        redirect_id: row.redirect_id,
        three_ds_mode: row.three_ds_mode,
        three_ds_redirect_endpoint: row.three_ds_redirect_endpoint,
        three_ds_redirect_id: row.three_ds_redirect_id,
        refunded_amount: None,
        period: row.period,
        initial_amount: row.initial_amount,
        schedule_settings: row.schedule_settings,
        next_payment_id: row.next_payment_id,
        next_payment_due_date: row.next_payment_due_date,
        next_payment_amount: row.next_payment_amount,
        cancelled_on: None,
        termination_mode: None,
        created_at: now,
        updated_at: now,
    }
}

fn is_active_subscription(payment: &PaymentEntity, user_id: Uuid) -> bool {
    payment.user_id == user_id
        && payment.payment_type == PaymentType::Recurring.as_str()
        && ACTIVE_SUBSCRIPTION_STATUSES.contains(&payment.status.as_str())
}

/// Payment store with the same single-active-subscription rule as Postgres.
#[derive(Default)]
pub struct InMemoryPayments {
    rows: Mutex<Vec<PaymentEntity>>,
    writes: AtomicUsize,
    /// Hides active subscriptions from `find_active_subscription`, emulating
    /// a competing request that commits between pre-check and insert.
    pub blind_pre_check: AtomicBool,
}

impl InMemoryPayments {
    pub fn insert(&self, payment: PaymentEntity) {
        self.rows.lock().unwrap().push(payment);
    }

    pub fn get(&self, payment_id: Uuid) -> Option<PaymentEntity> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == payment_id)
            .cloned()
    }

    pub fn all(&self) -> Vec<PaymentEntity> {
        self.rows.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPayments {
    async fn create_payment(&self, payment: InsertPaymentEntity) -> Result<CreatePaymentOutcome> {
        let mut rows = self.rows.lock().unwrap();
        if payment.payment_type == PaymentType::Recurring.as_str() {
            if let Some(existing) = rows
                .iter()
                .find(|p| is_active_subscription(p, payment.user_id))
            {
                return Ok(CreatePaymentOutcome::ActiveSubscriptionExists(
                    existing.clone(),
                ));
            }
        }
        let entity = entity_from_insert(payment);
        rows.push(entity.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(CreatePaymentOutcome::Created(entity))
    }

    async fn find_by_id(&self, payment_id: Uuid) -> Result<Option<PaymentEntity>> {
        Ok(self.get(payment_id))
    }

    async fn find_by_gateway_id(&self, gateway_id: &str) -> Result<Option<PaymentEntity>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.gateway_id.as_deref() == Some(gateway_id))
            .cloned())
    }

    async fn find_active_subscription(&self, user_id: Uuid) -> Result<Option<PaymentEntity>> {
        if self.blind_pre_check.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|p| is_active_subscription(p, user_id))
            .cloned())
    }

    async fn find_latest_subscription(&self, user_id: Uuid) -> Result<Option<PaymentEntity>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.user_id == user_id && p.payment_type == PaymentType::Recurring.as_str())
            .max_by_key(|p| p.created_at)
            .cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<PaymentEntity>> {
        let mut owned: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn apply_status_update(
        &self,
        payment_id: Uuid,
        update: StatusUpdate,
    ) -> Result<Option<PaymentEntity>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.iter_mut().find(|p| p.id == payment_id) else {
            return Ok(None);
        };
        row.merge_status_update(update);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(Some(row.clone()))
    }
}

#[derive(Default)]
pub struct InMemorySavedMethods {
    rows: Mutex<Vec<SavedPaymentMethodEntity>>,
}

impl InMemorySavedMethods {
    pub fn all(&self) -> Vec<SavedPaymentMethodEntity> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl SavedPaymentMethodRepository for InMemorySavedMethods {
    async fn upsert_saved_method(
        &self,
        token_id: &str,
        user_id: Uuid,
        attrs: SavedPaymentMethodAttrs,
    ) -> Result<SavedPaymentMethodEntity> {
        let now = Utc::now();
        let mut rows = self.rows.lock().unwrap();
        if let Some(existing) = rows.iter_mut().find(|m| m.token_id == token_id) {
            existing.last_used_at = Some(now);
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let entity = SavedPaymentMethodEntity {
            id: Uuid::new_v4(),
            user_id,
            token_id: token_id.to_string(),
            instrument_kind: attrs.instrument_kind.as_str().into(),
            family: attrs.family.as_str().into(),
            card_brand: attrs.brand,
            card_last_four: attrs.last_four,
            card_exp_month: attrs.exp_month,
            card_exp_year: attrs.exp_year,
            three_ds_enabled: attrs.three_ds_enabled,
            three_ds_status: attrs.three_ds_status,
            cvv_authorize_enabled: attrs.cvv_authorize_enabled,
            cvv_authorize_status: attrs.cvv_authorize_status,
            raw_payload: attrs.raw.unwrap_or_else(|| json!({})),
            is_active: true,
            last_used_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        rows.push(entity.clone());
        Ok(entity)
    }

    async fn find_by_token_id(&self, token_id: &str) -> Result<Option<SavedPaymentMethodEntity>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.token_id == token_id)
            .cloned())
    }

    async fn list_active_for_user(&self, user_id: Uuid) -> Result<Vec<SavedPaymentMethodEntity>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.user_id == user_id && m.is_active)
            .cloned()
            .collect())
    }

    async fn deactivate(
        &self,
        method_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<SavedPaymentMethodEntity>> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows
            .iter_mut()
            .find(|m| m.id == method_id && m.user_id == user_id)
        else {
            return Ok(None);
        };
        row.is_active = false;
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }
}
