// Error handling module for the takeaway API
// Provides the central error taxonomy and HTTP response conversion

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::db::is_transient;

/// Main error type for the API
/// All handlers return Result<T, ApiError>
///
/// Domain errors (cart, orders, wallet, coupons, auth) convert into this enum,
/// which decides the status code, the machine-readable code and how loudly
/// the failure is logged.
#[derive(Debug)]
pub enum ApiError {
    /// Validation errors from request validation
    /// Maps to HTTP 400 Bad Request
    ValidationError(validator::ValidationErrors),

    /// Business-rule violations the caller can fix (empty cart, below minimum...)
    /// Maps to HTTP 400 Bad Request
    BusinessRule { code: &'static str, message: String },

    /// Resource not found by ID
    /// Maps to HTTP 404 Not Found
    NotFound { resource: String, id: String },

    /// State conflicts (illegal transition, cross-restaurant cart)
    /// Maps to HTTP 409 Conflict
    Conflict { code: &'static str, message: String },

    /// Lock timeouts, statement timeouts, dropped connections
    /// Maps to HTTP 503; the client retries with the same idempotency key
    Retryable(String),

    /// Database operation errors
    /// Maps to HTTP 500 Internal Server Error
    /// Sensitive details are filtered from client responses
    DatabaseError(sqlx::Error),

    /// Internal server errors
    /// Maps to HTTP 500 Internal Server Error
    InternalError(String),

    /// Authentication failures
    /// Maps to HTTP 401 Unauthorized
    Unauthorized(String),

    /// Authorization failures
    /// Maps to HTTP 403 Forbidden
    Forbidden(String),
}

/// Consistent error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "VALIDATION_ERROR", "CART_EMPTY")
    pub error_code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (e.g., field-level validation errors)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,

    /// ISO 8601 timestamp of when the error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    fn new(error_code: &str, message: String) -> Self {
        Self {
            error_code: error_code.to_string(),
            message,
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let retryable = matches!(self, ApiError::Retryable(_));
        let (status, error_response) = self.to_error_response();
        let mut response = (status, Json(error_response)).into_response();
        if retryable {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

impl ApiError {
    /// Shorthand for a 400 business-rule violation
    pub fn rule(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::BusinessRule {
            code,
            message: message.into(),
        }
    }

    /// Shorthand for a 409 state conflict
    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Conflict {
            code,
            message: message.into(),
        }
    }

    /// Shorthand for a 404
    pub fn not_found(resource: &str, id: impl ToString) -> Self {
        ApiError::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    /// Convert ApiError to HTTP status code and ErrorResponse
    ///
    /// Logging level follows severity:
    /// - error!: database and internal errors (500-level)
    /// - warn!: conflicts, retryable failures, auth rejections
    /// - debug!: expected client errors (validation, rules, not found)
    fn to_error_response(&self) -> (StatusCode, ErrorResponse) {
        match self {
            ApiError::ValidationError(errors) => {
                debug!("Validation error: {:?}", errors);
                let mut response =
                    ErrorResponse::new("VALIDATION_ERROR", "Request validation failed".to_string());
                response.details =
                    Some(serde_json::to_value(errors).unwrap_or(serde_json::json!({})));
                (StatusCode::BAD_REQUEST, response)
            }
            ApiError::BusinessRule { code, message } => {
                debug!("Business rule rejected request: {} ({})", message, code);
                (StatusCode::BAD_REQUEST, ErrorResponse::new(code, message.clone()))
            }
            ApiError::NotFound { resource, id } => {
                debug!("Resource not found: {} with id {}", resource, id);
                (
                    StatusCode::NOT_FOUND,
                    ErrorResponse::new("NOT_FOUND", format!("{} with id {} not found", resource, id)),
                )
            }
            ApiError::Conflict { code, message } => {
                warn!("Conflict error: {} ({})", message, code);
                (StatusCode::CONFLICT, ErrorResponse::new(code, message.clone()))
            }
            ApiError::Retryable(cause) => {
                warn!("Transient failure, client may retry: {}", cause);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::new(
                        "RETRYABLE",
                        "The request could not be completed right now, please retry".to_string(),
                    ),
                )
            }
            ApiError::DatabaseError(db_error) => {
                // Full cause stays in the logs; clients get a generic message
                error!("Database error: {:?}", db_error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("DATABASE_ERROR", "A database error occurred".to_string()),
                )
            }
            ApiError::InternalError(internal_msg) => {
                error!("Internal error: {}", internal_msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(
                        "INTERNAL_ERROR",
                        "An internal server error occurred".to_string(),
                    ),
                )
            }
            ApiError::Unauthorized(message) => {
                warn!("Unauthorized access attempt: {}", message);
                (
                    StatusCode::UNAUTHORIZED,
                    ErrorResponse::new("UNAUTHORIZED", message.clone()),
                )
            }
            ApiError::Forbidden(message) => {
                warn!("Forbidden access attempt: {}", message);
                (StatusCode::FORBIDDEN, ErrorResponse::new("FORBIDDEN", message.clone()))
            }
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::BusinessRule { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Retryable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    /// Machine-readable code carried in the response body
    pub fn error_code(&self) -> &str {
        match self {
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::BusinessRule { code, .. } => code,
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::Conflict { code, .. } => code,
            ApiError::Retryable(_) => "RETRYABLE",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
        }
    }
}

/// Convert sqlx errors to ApiError, splitting retryable from fatal failures
impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        if is_transient(&error) {
            ApiError::Retryable(error.to_string())
        } else {
            ApiError::DatabaseError(error)
        }
    }
}

/// Convert validator errors to ApiError
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::rule("CART_EMPTY", "Cart is empty").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::conflict("INVALID_TRANSITION", "nope").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::not_found("Order", 7).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Retryable("lock timeout".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_transient_sqlx_errors_become_retryable() {
        let error: ApiError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(error, ApiError::Retryable(_)));

        let error: ApiError = sqlx::Error::RowNotFound.into();
        assert!(matches!(error, ApiError::DatabaseError(_)));
    }

    #[test]
    fn test_database_error_hides_details() {
        let error = ApiError::DatabaseError(sqlx::Error::ColumnNotFound("secret_col".into()));
        let (status, body) = error.to_error_response();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.message.contains("secret_col"));
        assert_eq!(body.error_code, "DATABASE_ERROR");
    }

    #[test]
    fn test_business_rule_code_is_exposed() {
        let error = ApiError::rule("BELOW_MINIMUM_ORDER", "Minimum order is 100.00");
        assert_eq!(error.error_code(), "BELOW_MINIMUM_ORDER");
        let (_, body) = error.to_error_response();
        assert_eq!(body.message, "Minimum order is 100.00");
    }

    #[test]
    fn test_retryable_sets_retry_after() {
        let response = ApiError::Retryable("timeout".into()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
    }
}
