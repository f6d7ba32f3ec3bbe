use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::ApiError;

/// Error types for coupon operations
#[derive(Debug, thiserror::Error)]
pub enum CouponError {
    #[error("Coupon code '{0}' is not valid")]
    InvalidCode(String),

    #[error("Coupon '{0}' not found")]
    NotFound(String),

    #[error("Coupon '{0}' is not active")]
    Inactive(String),

    #[error("Coupon '{code}' expired at {expired_at}")]
    Expired { code: String, expired_at: DateTime<Utc> },

    #[error("Coupon '{0}' has reached its usage limit")]
    UsageLimitReached(String),

    #[error("Coupon '{code}' requires a minimum order of {min_order}")]
    BelowMinimumOrder { code: String, min_order: Decimal },

    #[error("Coupon '{0}' has already been used the maximum number of times by this user")]
    PerUserLimitReached(String),

    #[error("Invalid coupon definition: {0}")]
    InvalidDefinition(String),

    #[error("Coupon code '{0}' already exists")]
    DuplicateCode(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<CouponError> for ApiError {
    fn from(err: CouponError) -> Self {
        let message = err.to_string();
        match err {
            CouponError::InvalidCode(_) => ApiError::rule("COUPON_INVALID_CODE", message),
            CouponError::NotFound(code) => ApiError::not_found("Coupon", code),
            CouponError::Inactive(_) => ApiError::rule("COUPON_INACTIVE", message),
            CouponError::Expired { .. } => ApiError::rule("COUPON_EXPIRED", message),
            CouponError::UsageLimitReached(_) => ApiError::rule("COUPON_EXHAUSTED", message),
            CouponError::BelowMinimumOrder { .. } => ApiError::rule("COUPON_MIN_ORDER", message),
            CouponError::PerUserLimitReached(_) => ApiError::rule("COUPON_ALREADY_USED", message),
            CouponError::InvalidDefinition(_) => ApiError::rule("INVALID_COUPON", message),
            CouponError::DuplicateCode(_) => ApiError::conflict("COUPON_EXISTS", message),
            CouponError::Database(e) => e.into(),
        }
    }
}
