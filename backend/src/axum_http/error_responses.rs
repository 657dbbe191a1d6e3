use axum::{
    Json,
    extract::rejection::JsonRejection,
    response::{IntoResponse, Response},
};
use crates::domain::value_objects::payment_requests::RequestValidationError;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::usecases::payment_errors::PaymentError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing: Option<Value>,
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = ErrorResponse {
            error: self.error_code(),
            detail: self.to_string(),
            status: None,
            body: None,
            existing: None,
        };

        match &self {
            PaymentError::Gateway(err) => {
                response.detail = "payment gateway request failed".to_string();
                response.status = Some(err.status);
                // Pass the provider body through untouched so clients see decline codes.
                response.body = Some(
                    serde_json::from_str(&err.body).unwrap_or_else(|_| Value::String(err.body.clone())),
                );
            }
            PaymentError::Conflict { existing } => {
                response.existing = serde_json::to_value(existing).ok();
            }
            PaymentError::Internal(err) => {
                error!(error = ?err, "http: internal error");
                // Don't leak internal error detail to client
                response.detail = "internal server error".to_string();
            }
            _ => {}
        }

        (status, Json(response)).into_response()
    }
}

/// Maps a body that failed to deserialize onto the validation error shape.
pub fn invalid_body(rejection: JsonRejection) -> Response {
    PaymentError::Validation(RequestValidationError::new("body", rejection.body_text()))
        .into_response()
}
