use std::fmt;

use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use validator::ValidationErrors;

use crate::constants::{DISPATCH_FAILED_MESSAGE, INTERNAL_ERROR_MESSAGE};

/// Field order used when reporting validation errors.
pub const CONTACT_FIELDS: [&str; 4] = ["name", "email", "subject", "message"];

#[derive(Debug)]
pub enum AppError {
    ValidationError(Vec<FieldError>),
    RateLimited(String),
    DispatchError(Option<String>),
    InternalError(Option<String>),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ValidationError(errors) => {
                let messages = errors.iter()
                    .map(|e| format!("{}:{}", e.field, e.message))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "validation error: {}", messages)
            }
            AppError::RateLimited(msg) => write!(f, "Rate limited: {}", msg),
            AppError::DispatchError(Some(detail)) => write!(f, "Dispatch failed: {}", detail),
            AppError::DispatchError(None) => write!(f, "Dispatch failed"),
            AppError::InternalError(Some(detail)) => write!(f, "Internal server error: {}", detail),
            AppError::InternalError(None) => write!(f, "Internal server error"),
        }
    }
}

impl AppError {
    /// Drops transport and internal detail unless the deployment opts in to exposing it.
    pub fn with_details(self, expose: bool) -> Self {
        if expose {
            return self;
        }
        match self {
            AppError::DispatchError(_) => AppError::DispatchError(None),
            AppError::InternalError(_) => AppError::InternalError(None),
            other => other,
        }
    }

    pub fn to_http_response(&self) -> HttpResponse {
        self.error_response()
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::ValidationError(errors) => {
                serde_json::json!({
                    "success": false,
                    "errors": errors
                })
            }
            AppError::RateLimited(msg) => {
                serde_json::json!({"success": false, "message": msg})
            }
            AppError::DispatchError(detail) => with_detail(DISPATCH_FAILED_MESSAGE, detail),
            AppError::InternalError(detail) => with_detail(INTERNAL_ERROR_MESSAGE, detail),
        };
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::DispatchError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn with_detail(message: &str, detail: &Option<String>) -> serde_json::Value {
    match detail {
        Some(detail) => serde_json::json!({
            "success": false,
            "message": message,
            "error": detail
        }),
        None => serde_json::json!({"success": false, "message": message}),
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let field_errors = errors.field_errors();

        // One reason per field, in form order, so the response is stable.
        let ordered = CONTACT_FIELDS
            .iter()
            .filter_map(|field| {
                let first = field_errors.get(*field)?.first()?;
                Some(FieldError {
                    field: field.to_string(),
                    message: first
                        .message
                        .as_ref()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "Invalid value".to_string()),
                })
            })
            .collect();

        AppError::ValidationError(ordered)
    }
}

impl From<MailError> for AppError {
    fn from(err: MailError) -> Self {
        AppError::DispatchError(Some(err.to_string()))
    }
}

#[derive(Debug, Display)]
pub enum MailError {
    #[display("Invalid address: {_0}")]
    InvalidAddress(String),

    #[display("Failed to build message: {_0}")]
    Build(String),

    #[display("Transport error: {_0}")]
    Transport(String),

    #[display("Server rejected message: {_0}")]
    Rejected(String),

    #[display("Mail transport timed out after {_0}s")]
    Timeout(u64),
}

impl std::error::Error for MailError {}

impl From<lettre::address::AddressError> for MailError {
    fn from(err: lettre::address::AddressError) -> Self {
        MailError::InvalidAddress(err.to_string())
    }
}

impl From<lettre::error::Error> for MailError {
    fn from(err: lettre::error::Error) -> Self {
        MailError::Build(err.to_string())
    }
}

impl From<lettre::transport::smtp::Error> for MailError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        MailError::Transport(err.to_string())
    }
}

#[derive(Debug, Display)]
pub enum RateLimitError {
    #[display("Rate limit store unavailable: {_0}")]
    StoreUnavailable(String),

    #[display("Rate limit store operation failed: {_0}")]
    StoreOperation(String),
}

impl std::error::Error for RateLimitError {}

impl From<deadpool_redis::PoolError> for RateLimitError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        RateLimitError::StoreUnavailable(err.to_string())
    }
}

impl From<redis::RedisError> for RateLimitError {
    fn from(err: redis::RedisError) -> Self {
        RateLimitError::StoreOperation(err.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    async fn body_json(err: AppError) -> serde_json::Value {
        let response = err.error_response();
        let bytes = to_bytes(response.into_body()).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn status_codes_keep_error_classes_apart() {
        assert_eq!(AppError::ValidationError(vec![]).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::RateLimited("slow down".into()).status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(AppError::DispatchError(None).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_rt::test]
    async fn dispatch_detail_is_hidden_unless_exposed() {
        let err = AppError::DispatchError(Some("smtp said no".into()));

        let hidden = body_json(AppError::DispatchError(Some("smtp said no".into())).with_details(false)).await;
        assert_eq!(hidden["success"], false);
        assert_eq!(hidden["message"], DISPATCH_FAILED_MESSAGE);
        assert!(hidden.get("error").is_none());

        let shown = body_json(err.with_details(true)).await;
        assert_eq!(shown["error"], "smtp said no");
    }

    #[actix_rt::test]
    async fn validation_body_lists_field_errors() {
        let body = body_json(AppError::ValidationError(vec![FieldError {
            field: "email".into(),
            message: "Please provide a valid email address".into(),
        }]))
        .await;

        assert_eq!(body["success"], false);
        assert_eq!(body["errors"][0]["field"], "email");
    }
}
