use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use crates::domain::repositories::{
    payments::PaymentRepository, saved_payment_methods::SavedPaymentMethodRepository,
    status_poll_scheduler::StatusPollScheduler,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    usecases::{gateway::PaymentGateway, payments::PaymentUseCase},
};

pub fn routes<P, M, G, S>(payment_usecase: Arc<PaymentUseCase<P, M, G, S>>) -> Router
where
    P: PaymentRepository + Send + Sync + 'static,
    M: SavedPaymentMethodRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    S: StatusPollScheduler + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(list_payments::<P, M, G, S>))
        .route("/:payment_id", get(get_payment::<P, M, G, S>))
        .route("/payment-methods", get(list_payment_methods::<P, M, G, S>))
        .route(
            "/payment-methods/:method_id/deactivate",
            post(deactivate_payment_method::<P, M, G, S>),
        )
        .with_state(payment_usecase)
}

pub async fn list_payments<P, M, G, S>(
    State(payment_usecase): State<Arc<PaymentUseCase<P, M, G, S>>>,
    auth: AuthUser,
) -> impl IntoResponse
where
    P: PaymentRepository + Send + Sync + 'static,
    M: SavedPaymentMethodRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    S: StatusPollScheduler + Send + Sync + 'static,
{
    match payment_usecase.list_payments(auth.user_id).await {
        Ok(payments) => (StatusCode::OK, Json(json!({ "payments": payments }))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn get_payment<P, M, G, S>(
    State(payment_usecase): State<Arc<PaymentUseCase<P, M, G, S>>>,
    auth: AuthUser,
    Path(payment_id): Path<Uuid>,
) -> impl IntoResponse
where
    P: PaymentRepository + Send + Sync + 'static,
    M: SavedPaymentMethodRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    S: StatusPollScheduler + Send + Sync + 'static,
{
    match payment_usecase.get_payment(auth.user_id, payment_id).await {
        Ok(payment) => (StatusCode::OK, Json(json!({ "payment": payment }))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn list_payment_methods<P, M, G, S>(
    State(payment_usecase): State<Arc<PaymentUseCase<P, M, G, S>>>,
    auth: AuthUser,
) -> impl IntoResponse
where
    P: PaymentRepository + Send + Sync + 'static,
    M: SavedPaymentMethodRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    S: StatusPollScheduler + Send + Sync + 'static,
{
    match payment_usecase.list_saved_methods(auth.user_id).await {
        Ok(methods) => {
            (StatusCode::OK, Json(json!({ "payment_methods": methods }))).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub async fn deactivate_payment_method<P, M, G, S>(
    State(payment_usecase): State<Arc<PaymentUseCase<P, M, G, S>>>,
    auth: AuthUser,
    Path(method_id): Path<Uuid>,
) -> impl IntoResponse
where
    P: PaymentRepository + Send + Sync + 'static,
    M: SavedPaymentMethodRepository + Send + Sync + 'static,
    G: PaymentGateway + Send + Sync + 'static,
    S: StatusPollScheduler + Send + Sync + 'static,
{
    match payment_usecase
        .deactivate_saved_method(auth.user_id, method_id)
        .await
    {
        Ok(method) => {
            (StatusCode::OK, Json(json!({ "ok": true, "payment_method": method }))).into_response()
        }
        Err(err) => err.into_response(),
    }
}
