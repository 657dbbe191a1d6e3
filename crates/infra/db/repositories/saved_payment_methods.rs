use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{OptionalExtension, RunQueryDsl, insert_into, prelude::*, update};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::saved_payment_methods},
};
use domain::{
    entities::saved_payment_methods::{InsertSavedPaymentMethodEntity, SavedPaymentMethodEntity},
    repositories::saved_payment_methods::SavedPaymentMethodRepository,
    value_objects::saved_payment_methods::SavedPaymentMethodAttrs,
};

pub struct SavedPaymentMethodPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SavedPaymentMethodPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SavedPaymentMethodRepository for SavedPaymentMethodPostgres {
    async fn upsert_saved_method(
        &self,
        token_id: &str,
        user_id: Uuid,
        attrs: SavedPaymentMethodAttrs,
    ) -> Result<SavedPaymentMethodEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        let insert_entity = InsertSavedPaymentMethodEntity {
            user_id,
            token_id: token_id.to_string(),
            instrument_kind: attrs.instrument_kind.to_string(),
            family: attrs.family.to_string(),
            card_brand: attrs.brand,
            card_last_four: attrs.last_four,
            card_exp_month: attrs.exp_month,
            card_exp_year: attrs.exp_year,
            three_ds_enabled: attrs.three_ds_enabled,
            three_ds_status: attrs.three_ds_status,
            cvv_authorize_enabled: attrs.cvv_authorize_enabled,
            cvv_authorize_status: attrs.cvv_authorize_status,
            raw_payload: attrs.raw.unwrap_or(Value::Object(Default::default())),
            is_active: true,
            last_used_at: Some(now),
        };

        // A single statement, so concurrent first uses of a token cannot both insert.
        let result = insert_into(saved_payment_methods::table)
            .values(&insert_entity)
            .on_conflict(saved_payment_methods::token_id)
            .do_update()
            .set((
                saved_payment_methods::last_used_at.eq(Some(now)),
                saved_payment_methods::updated_at.eq(now),
            ))
            .returning(SavedPaymentMethodEntity::as_returning())
            .get_result::<SavedPaymentMethodEntity>(&mut conn)?;

        Ok(result)
    }

    async fn find_by_token_id(&self, token_id: &str) -> Result<Option<SavedPaymentMethodEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = saved_payment_methods::table
            .filter(saved_payment_methods::token_id.eq(token_id))
            .select(SavedPaymentMethodEntity::as_select())
            .first::<SavedPaymentMethodEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn list_active_for_user(&self, user_id: Uuid) -> Result<Vec<SavedPaymentMethodEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = saved_payment_methods::table
            .filter(saved_payment_methods::user_id.eq(user_id))
            .filter(saved_payment_methods::is_active.eq(true))
            .order(saved_payment_methods::created_at.desc())
            .select(SavedPaymentMethodEntity::as_select())
            .load::<SavedPaymentMethodEntity>(&mut conn)?;

        Ok(results)
    }

    async fn deactivate(
        &self,
        method_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<SavedPaymentMethodEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = update(
            saved_payment_methods::table
                .filter(saved_payment_methods::id.eq(method_id))
                .filter(saved_payment_methods::user_id.eq(user_id)),
        )
        .set((
            saved_payment_methods::is_active.eq(false),
            saved_payment_methods::updated_at.eq(Utc::now()),
        ))
        .returning(SavedPaymentMethodEntity::as_returning())
        .get_result::<SavedPaymentMethodEntity>(&mut conn)
        .optional()?;

        Ok(result)
    }
}
