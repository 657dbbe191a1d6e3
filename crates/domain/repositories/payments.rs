use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::payments::{InsertPaymentEntity, PaymentEntity},
    value_objects::payments::{CreatePaymentOutcome, StatusUpdate},
};

#[async_trait]
#[automock]
pub trait PaymentRepository {
    /// Inserts a payment. Recurring inserts are serialized per owner and
    /// refused while the owner already holds an active subscription.
    async fn create_payment(&self, payment: InsertPaymentEntity) -> Result<CreatePaymentOutcome>;
    async fn find_by_id(&self, payment_id: Uuid) -> Result<Option<PaymentEntity>>;
    async fn find_by_gateway_id(&self, gateway_id: &str) -> Result<Option<PaymentEntity>>;
    async fn find_active_subscription(&self, user_id: Uuid) -> Result<Option<PaymentEntity>>;
    /// Most recent recurring payment for the owner, whatever its status.
    async fn find_latest_subscription(&self, user_id: Uuid) -> Result<Option<PaymentEntity>>;
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<PaymentEntity>>;
    /// Writes the observed status and correlated columns. `None` when the row is gone.
    async fn apply_status_update(
        &self,
        payment_id: Uuid,
        update: StatusUpdate,
    ) -> Result<Option<PaymentEntity>>;
}
