use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::saved_payment_methods::SavedPaymentMethodEntity,
    value_objects::saved_payment_methods::SavedPaymentMethodAttrs,
};

#[async_trait]
#[automock]
pub trait SavedPaymentMethodRepository {
    /// Returns the existing row for `token_id` with `last_used_at` refreshed,
    /// or inserts a new one.
    async fn upsert_saved_method(
        &self,
        token_id: &str,
        user_id: Uuid,
        attrs: SavedPaymentMethodAttrs,
    ) -> Result<SavedPaymentMethodEntity>;
    async fn find_by_token_id(&self, token_id: &str) -> Result<Option<SavedPaymentMethodEntity>>;
    async fn list_active_for_user(&self, user_id: Uuid) -> Result<Vec<SavedPaymentMethodEntity>>;
    /// Soft deactivation scoped to the owner. `None` when no such row is owned by `user_id`.
    async fn deactivate(
        &self,
        method_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<SavedPaymentMethodEntity>>;
}
