use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::cart::CartView;
use crate::pricing::AddOnSnapshot;

/// Order status enum representing the lifecycle of a takeaway order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Confirmed,
    Preparing,
    Ready,
    Collected,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Paid,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Collected,
        OrderStatus::Cancelled,
    ];

    /// Convert status to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Collected => "collected",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Invalid order status: {}", s))
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment state as reported by the payment gateway boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        };
        f.write_str(text)
    }
}

/// Order row
///
/// Monetary fields are fixed at creation; only the status-driven fields change later.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: i32,
    pub restaurant_id: i32,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub wallet_amount_used: Decimal,
    pub coupon_code: Option<String>,
    pub pickup_name: Option<String>,
    pub notes: Option<String>,
    /// Minutes, set when the restaurant confirms
    pub preparation_time: Option<i32>,
    #[serde(skip_serializing)]
    pub idempotency_key: Option<String>,
    #[serde(skip_serializing)]
    pub gateway_order_id: Option<String>,
    #[serde(skip_serializing)]
    pub gateway_payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order line as stored
#[derive(Debug, Clone, FromRow)]
pub struct OrderItemRow {
    pub id: i32,
    pub order_id: Uuid,
    pub menu_item_id: i32,
    pub name: String,
    pub variant_name: Option<String>,
    pub add_ons: Json<Vec<AddOnSnapshot>>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

/// Immutable snapshot of a cart line at checkout
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct OrderLine {
    pub id: i32,
    pub menu_item_id: i32,
    pub name: String,
    pub variant_name: Option<String>,
    pub add_ons: Vec<AddOnSnapshot>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

impl From<OrderItemRow> for OrderLine {
    fn from(row: OrderItemRow) -> Self {
        OrderLine {
            id: row.id,
            menu_item_id: row.menu_item_id,
            name: row.name,
            variant_name: row.variant_name,
            add_ons: row.add_ons.0,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price: row.total_price,
        }
    }
}

/// Values for a new order row
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub id: Uuid,
    pub user_id: i32,
    pub restaurant_id: i32,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub wallet_amount_used: Decimal,
    pub coupon_code: Option<String>,
    pub pickup_name: Option<String>,
    pub notes: Option<String>,
    pub idempotency_key: Option<String>,
}

/// Values for a new order line
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub menu_item_id: i32,
    pub name: String,
    pub variant_name: Option<String>,
    pub add_ons: Vec<AddOnSnapshot>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

/// Order together with its lines
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderLine>,
}

impl OrderResponse {
    pub fn new(order: Order, items: Vec<OrderLine>) -> Self {
        Self { order, items }
    }
}

/// Request body for POST /api/orders
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CreateOrderRequest {
    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    pub notes: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Pickup name must be 1-100 characters"))]
    pub pickup_name: Option<String>,
    /// Client token; retrying with the same key returns the same order
    #[validate(
        length(min = 1, max = 128, message = "Idempotency key must be 1-128 characters"),
        custom = "crate::validation::validate_idempotency_key"
    )]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub use_wallet: bool,
    #[validate(custom = "crate::validation::validate_coupon_code")]
    pub coupon_code: Option<String>,
}

/// Request body for PATCH /api/orders/{id}/status
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    /// Minutes; only accepted when moving to `confirmed`
    #[validate(range(min = 1, max = 240, message = "Preparation time must be 1-240 minutes"))]
    pub preparation_time: Option<i32>,
}

/// Request body for POST /api/orders/{id}/payment
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ConfirmPaymentRequest {
    #[validate(length(min = 1, max = 128))]
    pub gateway_order_id: String,
    #[validate(length(min = 1, max = 128))]
    pub gateway_payment_id: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
}

/// Line copied back into the cart by a reorder
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReorderedLine {
    pub menu_item_id: i32,
    pub name: String,
    pub quantity: i32,
}

/// Line a reorder could not copy, with the reason
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SkippedLine {
    pub menu_item_id: i32,
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReorderSummary {
    pub added: Vec<ReorderedLine>,
    pub skipped: Vec<SkippedLine>,
    pub cart: CartView,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_through_str() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("completed".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&OrderStatus::Preparing).unwrap(), "\"preparing\"");
        let status: OrderStatus = serde_json::from_str("\"ready\"").unwrap();
        assert_eq!(status, OrderStatus::Ready);
    }

    #[test]
    fn test_create_order_request_validation() {
        let request = CreateOrderRequest {
            idempotency_key: Some("has space".to_string()),
            ..Default::default()
        };
        assert!(request.validate().is_err());

        let request = CreateOrderRequest {
            idempotency_key: Some("checkout-1".to_string()),
            coupon_code: Some("save10".to_string()),
            use_wallet: true,
            ..Default::default()
        };
        assert!(request.validate().is_ok());
    }
}
