use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use crates::domain::{
    repositories::{
        notifier::PaymentNotifier, payments::PaymentRepository,
        saved_payment_methods::SavedPaymentMethodRepository,
        status_poll_scheduler::StatusPollScheduler,
    },
    value_objects::payment_requests::{
        CancelSubscriptionRequest, CreateSubscriptionRequest, RequestValidationError,
    },
};
use serde_json::json;

use crate::{
    auth::AuthUser,
    axum_http::error_responses::invalid_body,
    usecases::{
        cancel_refund::CancelRefundUseCase, gateway::PaymentGateway,
        payment_errors::PaymentError, payments::PaymentUseCase,
    },
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
    let lifecycle = Router::new()
        .route("/subscriptions", post(create_subscription::<P, M, G, S>))
        .route("/subscriptions/status", get(subscription_status::<P, M, G, S>))
        .with_state(payment_usecase);
    let cancel = Router::new()
        .route("/subscriptions/cancel", post(cancel_subscription::<P, G, N>))
        .with_state(cancel_refund_usecase);

    lifecycle.merge(cancel)
}

pub async fn create_subscription<P, M, G, S>(
    State(payment_usecase): State<Arc<PaymentUseCase<P, M, G, S>>>,
    auth: AuthUser,
    payload: Result<Json<CreateSubscriptionRequest>, JsonRejection>,
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

    match payment_usecase
        .create_subscription(&auth.payer(), request)
        .await
    {
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

pub async fn subscription_status<P, M, G, S>(
    State(payment_usecase): State<Arc<PaymentUseCase<P, M, G, S>>>,
    auth: AuthUser,
) -> impl IntoResponse
where
    P: PaymentRepository + Send + Sync + 'static,
    M: SavedPaymentMethodRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    S: StatusPollScheduler + Send + Sync + 'static,
{
    match payment_usecase.subscription_status(auth.user_id).await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(err) => err.into_response(),
    }
}

/// An empty body cancels the caller's active subscription immediately.
pub async fn cancel_subscription<P, G, N>(
    State(cancel_refund_usecase): State<Arc<CancelRefundUseCase<P, G, N>>>,
    auth: AuthUser,
    body: Bytes,
) -> impl IntoResponse
where
    P: PaymentRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    N: PaymentNotifier + Send + Sync + 'static,
{
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        CancelSubscriptionRequest::default()
    } else {
        match serde_json::from_slice::<CancelSubscriptionRequest>(&body) {
            Ok(request) => request,
            Err(err) => {
                return PaymentError::Validation(RequestValidationError::new(
                    "body",
                    err.to_string(),
                ))
                .into_response();
            }
        }
    };

    match cancel_refund_usecase
        .cancel_subscription(auth.user_id, request)
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({
                "ok": true,
                "payment": outcome.payment,
                "note": outcome.note,
            })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
