use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::entities::saved_payment_methods::SavedPaymentMethodEntity;
use crate::domain::value_objects::enums::instrument_kinds::{InstrumentKind, PaymentMethodFamily};

/// Descriptive attributes of a gateway token, as supplied by the client.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SavedPaymentMethodAttrs {
    #[serde(default)]
    pub instrument_kind: InstrumentKind,
    #[serde(default)]
    pub family: PaymentMethodFamily,
    #[serde(default, alias = "card_brand")]
    pub brand: Option<String>,
    #[serde(default, alias = "card_last_four")]
    pub last_four: Option<String>,
    #[serde(default)]
    pub exp_month: Option<i32>,
    #[serde(default)]
    pub exp_year: Option<i32>,
    #[serde(default)]
    pub three_ds_enabled: bool,
    #[serde(default)]
    pub three_ds_status: Option<String>,
    #[serde(default)]
    pub cvv_authorize_enabled: bool,
    #[serde(default)]
    pub cvv_authorize_status: Option<String>,
    #[serde(default)]
    pub raw: Option<Value>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SavedPaymentMethodDto {
    pub id: Uuid,
    pub token_id: String,
    pub instrument_kind: String,
    pub family: String,
    pub card_brand: Option<String>,
    pub card_last_four: Option<String>,
    pub card_exp_month: Option<i32>,
    pub card_exp_year: Option<i32>,
    pub three_ds_enabled: bool,
    pub cvv_authorize_enabled: bool,
    pub is_active: bool,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<SavedPaymentMethodEntity> for SavedPaymentMethodDto {
    fn from(value: SavedPaymentMethodEntity) -> Self {
        Self {
            id: value.id,
            token_id: value.token_id,
            instrument_kind: value.instrument_kind,
            family: value.family,
            card_brand: value.card_brand,
            card_last_four: value.card_last_four,
            card_exp_month: value.card_exp_month,
            card_exp_year: value.card_exp_year,
            three_ds_enabled: value.three_ds_enabled,
            cvv_authorize_enabled: value.cvv_authorize_enabled,
            is_active: value.is_active,
            last_used_at: value.last_used_at,
            created_at: value.created_at,
        }
    }
}
