use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use crates::domain::repositories::{
    notifier::PaymentNotifier, payments::PaymentRepository,
    status_poll_scheduler::StatusPollScheduler,
};
use serde_json::json;

use crate::usecases::{gateway::PaymentGateway, reconciler::StatusReconciler};

pub const SIGNATURE_HEADER: &str = "x-signature";

pub fn routes<P, G, S, N>(reconciler: Arc<StatusReconciler<P, G, S, N>>) -> Router
where
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    S: StatusPollScheduler + Send + Sync + 'static,
    N: PaymentNotifier + Send + Sync + 'static,
{
    Router::new()
        .route("/webhook", post(receive_webhook::<P, G, S, N>))
        .with_state(reconciler)
}

/// Unauthenticated; the raw body is checked against `X-Signature` before parsing.
pub async fn receive_webhook<P, G, S, N>(
    State(reconciler): State<Arc<StatusReconciler<P, G, S, N>>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse
where
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    S: StatusPollScheduler + Send + Sync + 'static,
    N: PaymentNotifier + Send + Sync + 'static,
{
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    match reconciler.handle_webhook(&body, signature).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({ "ok": true, "updated": outcome.updated })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::response::Response;
    use crates::domain::repositories::{
        notifier::MockPaymentNotifier, status_poll_scheduler::MockStatusPollScheduler,
    };
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    use uuid::Uuid;

    use super::*;
    use crate::usecases::{
        gateway::MockPaymentGateway,
        reconciler::ReconcilerConfig,
        test_support::{InMemoryPayments, sample_charge},
    };

    type Reconciler = StatusReconciler<
        InMemoryPayments,
        MockPaymentGateway,
        MockStatusPollScheduler,
        MockPaymentNotifier,
    >;

    const SECRET: &str = "whsec_router";

    fn reconciler(payments: Arc<InMemoryPayments>) -> Arc<Reconciler> {
        Arc::new(StatusReconciler::new(
            payments,
            Arc::new(MockPaymentGateway::new()),
            Arc::new(MockStatusPollScheduler::new()),
            Arc::new(MockPaymentNotifier::new()),
            ReconcilerConfig {
                poll_after: Duration::from_secs(30),
                poll_retry_after: Duration::from_secs(60),
                poll_fallback_enabled: true,
                webhook_secret: Some(SECRET.into()),
            },
        ))
    }

    fn signed_headers(body: &[u8]) -> HeaderMap {
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(body);
        let mut headers = HeaderMap::new();
        headers.insert(
            SIGNATURE_HEADER,
            hex::encode(mac.finalize().into_bytes()).parse().unwrap(),
        );
        headers
    }

    async fn call(reconciler: Arc<Reconciler>, headers: HeaderMap, body: &'static [u8]) -> Response {
        receive_webhook(State(reconciler), headers, Bytes::from_static(body))
            .await
            .into_response()
    }

    #[tokio::test]
    async fn unsigned_webhook_is_rejected_without_touching_state() {
        let payments = Arc::new(InMemoryPayments::default());
        let response = call(
            reconciler(Arc::clone(&payments)),
            HeaderMap::new(),
            br#"{"status":"successful","charge":{"id":"ch_1"}}"#,
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(payments.write_count(), 0);
    }

    #[tokio::test]
    async fn signed_webhook_updates_the_matching_payment() {
        let payments = Arc::new(InMemoryPayments::default());
        let mut charge = sample_charge(Uuid::new_v4(), "pending", 1000);
        charge.gateway_id = Some("ch_1".into());
        payments.insert(charge.clone());

        let body: &'static [u8] = br#"{"event":"charge_finished","status":"successful","charge":{"id":"ch_1"}}"#;
        let response = call(reconciler(Arc::clone(&payments)), signed_headers(body), body).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(payments.get(charge.id).unwrap().status, "successful");
    }

    #[tokio::test]
    async fn signed_webhook_for_unknown_payment_still_acknowledges() {
        let payments = Arc::new(InMemoryPayments::default());
        let body: &'static [u8] = br#"{"event":"charge_finished","status":"failed","charge":{"id":"ch_x"}}"#;
        let response = call(reconciler(Arc::clone(&payments)), signed_headers(body), body).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(payments.write_count(), 0);
    }
}
