use async_trait::async_trait;
use crates::payments::gateway_client::{
    ChargeParams, GatewayClient, GatewayResult, RefundParams, SubscriptionParams,
};
use serde_json::Value;

/// Seam over [`GatewayClient`] so use cases can run against a mock gateway.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_charge(&self, params: ChargeParams, idempotency_key: String)
    -> GatewayResult<Value>;

    async fn get_charge(&self, charge_id: &str) -> GatewayResult<Value>;

    async fn create_subscription(
        &self,
        params: SubscriptionParams,
        idempotency_key: String,
    ) -> GatewayResult<Value>;

    async fn get_subscription(&self, subscription_id: &str) -> GatewayResult<Value>;

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        termination_mode: &str,
    ) -> GatewayResult<Value>;

    async fn refund_charge(
        &self,
        charge_id: &str,
        params: RefundParams,
        idempotency_key: String,
    ) -> GatewayResult<Value>;
}

#[async_trait]
impl PaymentGateway for GatewayClient {
    async fn create_charge(
        &self,
        params: ChargeParams,
        idempotency_key: String,
    ) -> GatewayResult<Value> {
        self.create_charge(&params, &idempotency_key).await
    }

    async fn get_charge(&self, charge_id: &str) -> GatewayResult<Value> {
        self.get_charge(charge_id).await
    }

    async fn create_subscription(
        &self,
        params: SubscriptionParams,
        idempotency_key: String,
    ) -> GatewayResult<Value> {
        self.create_subscription(&params, &idempotency_key).await
    }

    async fn get_subscription(&self, subscription_id: &str) -> GatewayResult<Value> {
        self.get_subscription(subscription_id).await
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &str,
        termination_mode: &str,
    ) -> GatewayResult<Value> {
        self.cancel_subscription(subscription_id, termination_mode)
            .await
    }

    async fn refund_charge(
        &self,
        charge_id: &str,
        params: RefundParams,
        idempotency_key: String,
    ) -> GatewayResult<Value> {
        self.refund_charge(charge_id, &params, &idempotency_key)
            .await
    }
}
