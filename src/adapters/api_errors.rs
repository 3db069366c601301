use crate::domain::error::BillingError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Newtype over the domain error so the HTTP mapping lives in the
/// adapter layer. Anything non-2xx makes the provider redeliver the
/// webhook, which is exactly what we want for transient failures.
pub struct ApiError(pub BillingError);

impl From<BillingError> for ApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self.0 {
            BillingError::Signature(_) => (
                StatusCode::BAD_REQUEST,
                "signature_error",
                "invalid webhook signature".to_string(),
            ),
            BillingError::Payload(msg) => {
                (StatusCode::BAD_REQUEST, "payload_error", msg.clone())
            }
            BillingError::UnsupportedEvent(event_type) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "unsupported_event",
                format!("unsupported event type: {event_type}"),
            ),
            BillingError::UserNotFound(customer) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "user_not_found",
                format!("no user for customer: {customer}"),
            ),
            BillingError::InsufficientCredits { .. } => (
                StatusCode::CONFLICT,
                "insufficient_credits",
                self.0.to_string(),
            ),
            BillingError::InvalidInput(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_input",
                msg.clone(),
            ),
            BillingError::Provider(err) => {
                tracing::error!("provider error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".to_string(),
                )
            }
            BillingError::Database(err) => {
                tracing::error!("database error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".to_string(),
                )
            }
            BillingError::Serialization(err) => {
                tracing::error!("serialization error: {err}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal error".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error_code": error_code,
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}
