use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::billing::stripe::StripeError;
use crate::db::is_unique_violation;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Plan limit reached: {0}")]
    PlanLimit(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Billing error: {0}")]
    Billing(#[from] StripeError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Status code and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::PlanLimit(_) => (StatusCode::FORBIDDEN, "PLAN_LIMIT_REACHED"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::Database(e) if is_unique_violation(e) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            AppError::Redis(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CACHE_ERROR"),
            AppError::Llm(e) => match e {
                LlmError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "AI_RATE_LIMITED"),
                LlmError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "AI_AUTH_FAILED"),
                _ => (StatusCode::BAD_GATEWAY, "AI_SERVICE_ERROR"),
            },
            AppError::Billing(e) => match e {
                StripeError::Api { kind, .. } if kind == "card_error" => {
                    (StatusCode::PAYMENT_REQUIRED, "BILLING_ERROR")
                }
                StripeError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "BILLING_ERROR"),
                _ => (StatusCode::BAD_GATEWAY, "BILLING_ERROR"),
            },
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Client-facing message. Internal failures are logged and replaced with a
    /// generic message.
    fn public_message(&self) -> String {
        match self {
            AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::Unauthorized(msg)
            | AppError::PlanLimit(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::Database(e) if is_unique_violation(e) => {
                "A record with these values already exists".to_string()
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                "A database error occurred".to_string()
            }
            AppError::Redis(e) => {
                tracing::error!("Redis error: {e}");
                "A usage tracking error occurred".to_string()
            }
            AppError::Llm(e) => {
                tracing::error!("LLM error: {e}");
                match e {
                    LlmError::RateLimited { .. } => {
                        "The AI service is busy. Please try again in a moment.".to_string()
                    }
                    LlmError::Unauthorized(_) => {
                        "The AI service rejected our credentials".to_string()
                    }
                    _ => "The AI service is currently unavailable".to_string(),
                }
            }
            AppError::Billing(e) => {
                tracing::error!("Billing error: {e}");
                match e {
                    StripeError::Api { kind, message, .. } if kind == "card_error" => {
                        message.clone()
                    }
                    StripeError::RateLimited => {
                        "The payment service is busy. Please try again.".to_string()
                    }
                    _ => "The payment service is currently unavailable".to_string(),
                }
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal server error occurred".to_string()
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.public_message();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_400() {
        let err = AppError::Validation("bad".to_string());
        assert_eq!(err.status_and_code().0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_plan_limit_maps_to_403() {
        let err = AppError::PlanLimit("limit".to_string());
        assert_eq!(err.status_and_code(), (StatusCode::FORBIDDEN, "PLAN_LIMIT_REACHED"));
    }

    #[test]
    fn test_llm_errors_map_by_variant() {
        let rate = AppError::Llm(LlmError::RateLimited { retry_after: 30 });
        assert_eq!(rate.status_and_code().0, StatusCode::TOO_MANY_REQUESTS);

        let auth = AppError::Llm(LlmError::Unauthorized("bad key".to_string()));
        assert_eq!(auth.status_and_code().0, StatusCode::UNAUTHORIZED);

        let api = AppError::Llm(LlmError::Api {
            status: 500,
            message: "overloaded".to_string(),
        });
        assert_eq!(api.status_and_code().0, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_card_error_maps_to_402() {
        let err = AppError::Billing(StripeError::Api {
            kind: "card_error".to_string(),
            code: Some("card_declined".to_string()),
            message: "Your card was declined.".to_string(),
        });
        assert_eq!(err.status_and_code().0, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(err.public_message(), "Your card was declined.");
    }

    #[test]
    fn test_internal_error_message_is_generic() {
        let err = AppError::Internal(anyhow::anyhow!("connection string leaked"));
        let msg = err.public_message();
        assert!(!msg.contains("leaked"));
        assert_eq!(err.status_and_code().0, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
