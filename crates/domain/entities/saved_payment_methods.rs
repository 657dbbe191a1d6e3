use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::infra::db::postgres::schema::saved_payment_methods;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = saved_payment_methods)]
pub struct SavedPaymentMethodEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_id: String,
    pub instrument_kind: String,
    pub family: String,
    pub card_brand: Option<String>,
    pub card_last_four: Option<String>,
    pub card_exp_month: Option<i32>,
    pub card_exp_year: Option<i32>,
    pub three_ds_enabled: bool,
    pub three_ds_status: Option<String>,
    pub cvv_authorize_enabled: bool,
    pub cvv_authorize_status: Option<String>,
    pub raw_payload: Value,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = saved_payment_methods)]
pub struct InsertSavedPaymentMethodEntity {
    pub user_id: Uuid,
    pub token_id: String,
    pub instrument_kind: String,
    pub family: String,
    pub card_brand: Option<String>,
    pub card_last_four: Option<String>,
    pub card_exp_month: Option<i32>,
    pub card_exp_year: Option<i32>,
    pub three_ds_enabled: bool,
    pub three_ds_status: Option<String>,
    pub cvv_authorize_enabled: bool,
    pub cvv_authorize_status: Option<String>,
    pub raw_payload: Value,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
}
