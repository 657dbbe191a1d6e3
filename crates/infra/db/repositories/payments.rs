use anyhow::Result;
use async_trait::async_trait;
use diesel::{
    OptionalExtension, PgConnection, RunQueryDsl,
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
    sql_query,
    sql_types::Text,
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::payments},
};
use domain::{
    entities::payments::{
        InsertPaymentEntity, PaymentEntity, PaymentObservationChangeset, PaymentStatusChangeset,
    },
    repositories::payments::PaymentRepository,
    value_objects::{
        enums::{payment_statuses::ACTIVE_SUBSCRIPTION_STATUSES, payment_types::PaymentType},
        payments::{CreatePaymentOutcome, StatusUpdate, StatusUpdateKind},
    },
};

const ACTIVE_SUBSCRIPTION_INDEX: &str = "payments_one_active_subscription_per_user";

pub struct PaymentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl PaymentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn active_subscription(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> QueryResult<Option<PaymentEntity>> {
    payments::table
        .filter(payments::user_id.eq(user_id))
        .filter(payments::payment_type.eq(PaymentType::Recurring.as_str()))
        .filter(payments::status.eq_any(ACTIVE_SUBSCRIPTION_STATUSES))
        .order(payments::created_at.desc())
        .select(PaymentEntity::as_select())
        .first::<PaymentEntity>(conn)
        .optional()
}

#[async_trait]
impl PaymentRepository for PaymentPostgres {
    async fn create_payment(&self, payment: InsertPaymentEntity) -> Result<CreatePaymentOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        if payment.payment_type != PaymentType::Recurring.as_str() {
            let created = diesel::insert_into(payments::table)
                .values(&payment)
                .returning(PaymentEntity::as_returning())
                .get_result::<PaymentEntity>(&mut conn)?;
            return Ok(CreatePaymentOutcome::Created(created));
        }

        let user_id = payment.user_id;
        let result = conn.transaction::<CreatePaymentOutcome, DieselError, _>(|conn| {
            // Serializes subscription creation per owner for the rest of the transaction.
            sql_query("SELECT pg_advisory_xact_lock(hashtext($1))")
                .bind::<Text, _>(user_id.to_string())
                .execute(conn)?;

            if let Some(existing) = active_subscription(conn, user_id)? {
                return Ok(CreatePaymentOutcome::ActiveSubscriptionExists(existing));
            }

            let created = diesel::insert_into(payments::table)
                .values(&payment)
                .returning(PaymentEntity::as_returning())
                .get_result::<PaymentEntity>(conn)?;
            Ok(CreatePaymentOutcome::Created(created))
        });

        match result {
            Ok(outcome) => Ok(outcome),
            // Backstop for writers that bypass the advisory lock.
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info))
                if info.constraint_name() == Some(ACTIVE_SUBSCRIPTION_INDEX) =>
            {
                warn!(%user_id, "payments: active subscription index rejected insert");
                match active_subscription(&mut conn, user_id)? {
                    Some(existing) => Ok(CreatePaymentOutcome::ActiveSubscriptionExists(existing)),
                    None => Err(anyhow::anyhow!(
                        "active subscription conflict for user {user_id} but no active row found"
                    )),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_by_id(&self, payment_id: Uuid) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payments::table
            .find(payment_id)
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_by_gateway_id(&self, gateway_id: &str) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payments::table
            .filter(payments::gateway_id.eq(gateway_id))
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_active_subscription(&self, user_id: Uuid) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        Ok(active_subscription(&mut conn, user_id)?)
    }

    async fn find_latest_subscription(&self, user_id: Uuid) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = payments::table
            .filter(payments::user_id.eq(user_id))
            .filter(payments::payment_type.eq(PaymentType::Recurring.as_str()))
            .order(payments::created_at.desc())
            .select(PaymentEntity::as_select())
            .first::<PaymentEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = payments::table
            .filter(payments::user_id.eq(user_id))
            .order(payments::created_at.desc())
            .select(PaymentEntity::as_select())
            .load::<PaymentEntity>(&mut conn)?;

        Ok(results)
    }

    async fn apply_status_update(
        &self,
        payment_id: Uuid,
        update: StatusUpdate,
    ) -> Result<Option<PaymentEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let target = payments::table.find(payment_id);

        let result = match update.kind {
            StatusUpdateKind::Transition => diesel::update(target)
                .set(&PaymentStatusChangeset::from(update))
                .returning(PaymentEntity::as_returning())
                .get_result::<PaymentEntity>(&mut conn)
                .optional()?,
            StatusUpdateKind::Observation => {
                let (observed, snapshot) = PaymentObservationChangeset::split(update);
                diesel::update(target)
                    .set((&observed, &snapshot))
                    .returning(PaymentEntity::as_returning())
                    .get_result::<PaymentEntity>(&mut conn)
                    .optional()?
            }
        };

        Ok(result)
    }
}
