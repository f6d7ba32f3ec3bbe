// Notification dispatcher
// Persists in-app notifications; delivery is best-effort and driven by the outbox.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::orders::OrderStatus;

/// One notification for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub user_id: i32,
    pub title: String,
    pub body: String,
    pub reference_id: Option<Uuid>,
}

impl NotificationMessage {
    /// Message sent to the customer when their order enters `status`
    pub fn order_status(user_id: i32, order_id: Uuid, status: OrderStatus) -> Self {
        let short_id = order_id.simple().to_string();
        let short_id = &short_id[..8];
        let (title, body) = match status {
            OrderStatus::Pending => (
                "Order placed",
                format!("Your order #{} has been placed.", short_id),
            ),
            OrderStatus::Paid => (
                "Payment received",
                format!("Payment for order #{} was confirmed.", short_id),
            ),
            OrderStatus::Confirmed => (
                "Order confirmed",
                format!("The restaurant accepted order #{}.", short_id),
            ),
            OrderStatus::Preparing => (
                "Order in the kitchen",
                format!("Order #{} is being prepared.", short_id),
            ),
            OrderStatus::Ready => (
                "Ready for pickup",
                format!("Order #{} is ready. Please collect it at the counter.", short_id),
            ),
            OrderStatus::Collected => (
                "Order collected",
                format!("Enjoy your meal! Order #{} has been collected.", short_id),
            ),
            OrderStatus::Cancelled => (
                "Order cancelled",
                format!("Order #{} was cancelled. Any wallet amount used has been refunded.", short_id),
            ),
        };

        NotificationMessage {
            user_id,
            title: title.to_string(),
            body,
            reference_id: Some(order_id),
        }
    }

    /// Message sent to the restaurant owner when a customer places an order
    pub fn new_order(owner_id: i32, order_id: Uuid, total: Decimal) -> Self {
        let short_id = order_id.simple().to_string();
        NotificationMessage {
            user_id: owner_id,
            title: "New order".to_string(),
            body: format!("Order #{} for {} is waiting to be confirmed.", &short_id[..8], total),
            reference_id: Some(order_id),
        }
    }
}

pub struct NotificationDispatcher;

impl NotificationDispatcher {
    /// Store the notification for the user's inbox
    pub async fn dispatch(
        conn: &mut PgConnection,
        message: &NotificationMessage,
    ) -> Result<i64, sqlx::Error> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO notifications (user_id, title, body, reference_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(message.user_id)
        .bind(&message.title)
        .bind(&message.body)
        .bind(message.reference_id)
        .fetch_one(&mut *conn)
        .await?;

        tracing::debug!("Stored notification {} for user {}", id, message.user_id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_message_references_order() {
        let order_id = Uuid::new_v4();
        let message = NotificationMessage::order_status(7, order_id, OrderStatus::Ready);
        assert_eq!(message.user_id, 7);
        assert_eq!(message.title, "Ready for pickup");
        assert_eq!(message.reference_id, Some(order_id));
        assert!(message.body.contains(&order_id.simple().to_string()[..8]));
    }

    #[test]
    fn test_new_order_message_goes_to_owner() {
        let order_id = Uuid::new_v4();
        let message = NotificationMessage::new_order(3, order_id, rust_decimal_macros::dec!(245.50));
        assert_eq!(message.user_id, 3);
        assert!(message.body.contains("245.50"));
    }
}
