use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// How the discount value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// Fixed amount off the subtotal
    Flat,
    /// Percent of the subtotal, optionally capped by `max_discount`
    Percentage,
}

impl std::fmt::Display for DiscountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscountType::Flat => write!(f, "flat"),
            DiscountType::Percentage => write!(f, "percentage"),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Coupon {
    pub id: i32,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub max_discount: Option<Decimal>,
    pub min_order: Decimal,
    /// Global cap across all users; `None` is unlimited
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub per_user_limit: i32,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Usage counts consulted by the caps
///
/// `pending_*` are redemptions already queued by committed orders but not yet
/// written to the redemption ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct CouponUsage {
    pub user_redemptions: i64,
    pub pending_total: i64,
    pub pending_user: i64,
}

/// Discount granted by a coupon at checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AppliedCoupon {
    pub coupon_id: i32,
    pub code: String,
    pub discount: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CouponRedemption {
    pub id: i32,
    pub coupon_id: i32,
    pub user_id: i32,
    pub order_id: Uuid,
    pub discount_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Request body for POST /api/coupons/validate
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ValidateCouponRequest {
    #[validate(custom = "crate::validation::validate_coupon_code")]
    pub code: String,
}

/// Discount the caller's current cart would receive
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CouponPreview {
    pub code: String,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total_after_discount: Decimal,
}

/// Request body for POST /api/admin/coupons
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateCouponRequest {
    #[validate(custom = "crate::validation::validate_coupon_code")]
    pub code: String,
    pub discount_type: DiscountType,
    #[validate(custom = "crate::validation::validate_positive_amount")]
    pub discount_value: Decimal,
    #[validate(custom = "crate::validation::validate_positive_amount")]
    pub max_discount: Option<Decimal>,
    #[serde(default)]
    pub min_order: Decimal,
    #[validate(range(min = 1, message = "Usage limit must be at least 1"))]
    pub usage_limit: Option<i32>,
    #[serde(default = "default_per_user_limit")]
    #[validate(range(min = 1, message = "Per-user limit must be at least 1"))]
    pub per_user_limit: i32,
    pub expires_at: Option<DateTime<Utc>>,
}

fn default_per_user_limit() -> i32 {
    1
}
