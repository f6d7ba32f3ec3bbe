// Durable post-commit side effects
// Tasks are inserted in the same transaction as the state change that caused
// them and executed by a background worker after commit.

pub mod repository;
pub mod worker;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::notifications::NotificationMessage;

pub use repository::{OutboxRepository, OutboxTask};
pub use worker::{backoff_delay, OutboxHandle, OutboxWorker};

/// `kind` column value for coupon redemption tasks
pub const COUPON_USAGE_KIND: &str = "record_coupon_usage";
/// `kind` column value for notification tasks
pub const NOTIFY_KIND: &str = "notify";

/// Work to perform once the enqueuing transaction has committed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SideEffect {
    RecordCouponUsage {
        coupon_id: i32,
        user_id: i32,
        order_id: Uuid,
        discount: Decimal,
    },
    Notify(NotificationMessage),
}

impl SideEffect {
    pub fn kind(&self) -> &'static str {
        match self {
            SideEffect::RecordCouponUsage { .. } => COUPON_USAGE_KIND,
            SideEffect::Notify(_) => NOTIFY_KIND,
        }
    }
}

/// Why a side effect failed
#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("Malformed task payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Coupon redemption failed: {0}")]
    Coupon(#[from] crate::coupons::CouponError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl OutboxError {
    /// Payload errors will never succeed on retry
    pub fn is_permanent(&self) -> bool {
        matches!(self, OutboxError::Payload(_))
    }
}
