use axum::http::StatusCode;
use crates::{
    domain::value_objects::{payment_requests::RequestValidationError, payments::PaymentSummary},
    payments::gateway_client::GatewayError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("invalid request: {0}")]
    Validation(#[from] RequestValidationError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("an active subscription already exists")]
    Conflict { existing: PaymentSummary },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("invalid webhook signature")]
    Unauthorized,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PaymentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PaymentError::Validation(_) => StatusCode::BAD_REQUEST,
            // Client-side gateway rejections (card declined, bad token) are the
            // caller's problem; anything else means the gateway is unhealthy.
            PaymentError::Gateway(err) if (400..500).contains(&err.status) => {
                StatusCode::BAD_REQUEST
            }
            PaymentError::Gateway(_) => StatusCode::BAD_GATEWAY,
            PaymentError::Conflict { .. } => StatusCode::CONFLICT,
            PaymentError::NotFound(_) => StatusCode::NOT_FOUND,
            PaymentError::Unauthorized => StatusCode::UNAUTHORIZED,
            PaymentError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            PaymentError::Validation(_) => "validation_error",
            PaymentError::Gateway(_) => "gateway_error",
            PaymentError::Conflict { .. } => "active_subscription_exists",
            PaymentError::NotFound(_) => "not_found",
            PaymentError::Unauthorized => "unauthorized",
            PaymentError::Internal(_) => "internal_error",
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, PaymentError>;
