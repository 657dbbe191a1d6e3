use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use crates::domain::{
    repositories::{
        notifier::PaymentNotifier, payments::PaymentRepository,
        saved_payment_methods::SavedPaymentMethodRepository,
        status_poll_scheduler::StatusPollScheduler,
    },
    value_objects::payment_requests::{CreateChargeRequest, RefundChargeRequest},
};
use serde_json::json;

use crate::{
    auth::AuthUser,
    axum_http::error_responses::invalid_body,
    usecases::{cancel_refund::CancelRefundUseCase, gateway::PaymentGateway, payments::PaymentUseCase},
};

pub fn routes<P, M, G, S, N>(
    payment_usecase: Arc<PaymentUseCase<P, M, G, S>>,
    cancel_refund_usecase: Arc<CancelRefundUseCase<P, G, N>>,
) -> Router
where
    P: PaymentRepository + Send + Sync + 'static,
    M: SavedPaymentMethodRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    S: StatusPollScheduler + Send + Sync + 'static,
    N: PaymentNotifier + Send + Sync + 'static,
{
    let create = Router::new()
        .route("/charges", post(create_charge::<P, M, G, S>))
        .with_state(payment_usecase);
    let refund = Router::new()
        .route("/charges/refund", post(refund_charge::<P, G, N>))
        .with_state(cancel_refund_usecase);

    create.merge(refund)
}

pub async fn create_charge<P, M, G, S>(
    State(payment_usecase): State<Arc<PaymentUseCase<P, M, G, S>>>,
    auth: AuthUser,
    payload: Result<Json<CreateChargeRequest>, JsonRejection>,
) -> impl IntoResponse
where
    P: PaymentRepository + Send + Sync + 'static,
    M: SavedPaymentMethodRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    S: StatusPollScheduler + Send + Sync + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return invalid_body(rejection),
    };

    match payment_usecase.create_charge(&auth.payer(), request).await {
        Ok(created) => (
            StatusCode::CREATED,
            Json(json!({
                "ok": true,
                "payment": created.payment,
                "gateway": created.gateway,
            })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn refund_charge<P, G, N>(
    State(cancel_refund_usecase): State<Arc<CancelRefundUseCase<P, G, N>>>,
    auth: AuthUser,
    payload: Result<Json<RefundChargeRequest>, JsonRejection>,
) -> impl IntoResponse
where
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: PaymentNotifier + Send + Sync + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return invalid_body(rejection),
    };

    match cancel_refund_usecase
        .refund_charge(auth.user_id, request)
        .await
    {
        Ok(payment) => (
            StatusCode::OK,
            Json(json!({ "ok": true, "payment": payment })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
