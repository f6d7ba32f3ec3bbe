use sqlx::types::Json;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::orders::{NewOrder, NewOrderLine, Order, OrderItemRow, OrderStatus, PaymentStatus};

const ORDER_COLUMNS: &str = "id, user_id, restaurant_id, status, payment_status, subtotal, \
     discount_amount, total_amount, wallet_amount_used, coupon_code, pickup_name, notes, \
     preparation_time, idempotency_key, gateway_order_id, gateway_payment_id, created_at, updated_at";

const ORDER_ITEM_COLUMNS: &str =
    "id, order_id, menu_item_id, name, variant_name, add_ons, quantity, unit_price, total_price";

const HISTORY_LIMIT: i64 = 100;

/// Repository for order rows; all calls run on the caller's connection
pub struct OrdersRepository;

impl OrdersRepository {
    /// Insert the order row with status=pending and payment_status=pending
    pub async fn insert(conn: &mut PgConnection, order: &NewOrder) -> Result<Order, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"
            INSERT INTO orders (id, user_id, restaurant_id, status, payment_status, subtotal,
                                discount_amount, total_amount, wallet_amount_used, coupon_code,
                                pickup_name, notes, idempotency_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.restaurant_id)
        .bind(OrderStatus::Pending)
        .bind(PaymentStatus::Pending)
        .bind(order.subtotal)
        .bind(order.discount_amount)
        .bind(order.total_amount)
        .bind(order.wallet_amount_used)
        .bind(&order.coupon_code)
        .bind(&order.pickup_name)
        .bind(&order.notes)
        .bind(&order.idempotency_key)
        .fetch_one(&mut *conn)
        .await
    }

    pub async fn find_by_id(
        conn: &mut PgConnection,
        order_id: Uuid,
    ) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
            .bind(order_id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Lock the order row for a status change
    pub async fn lock_by_id(
        conn: &mut PgConnection,
        order_id: Uuid,
    ) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE id = $1 FOR UPDATE",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&mut *conn)
        .await
    }

    pub async fn find_by_idempotency_key(
        conn: &mut PgConnection,
        user_id: i32,
        idempotency_key: &str,
    ) -> Result<Option<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE user_id = $1 AND idempotency_key = $2",
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .bind(idempotency_key)
        .fetch_optional(&mut *conn)
        .await
    }

    /// Set the status, stamping `updated_at`
    ///
    /// `preparation_time` and `payment_status` are only overwritten when given.
    pub async fn update_status(
        conn: &mut PgConnection,
        order_id: Uuid,
        status: OrderStatus,
        preparation_time: Option<i32>,
        payment_status: Option<PaymentStatus>,
    ) -> Result<Order, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET status = $2,
                preparation_time = COALESCE($3, preparation_time),
                payment_status = COALESCE($4, payment_status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .bind(status)
        .bind(preparation_time)
        .bind(payment_status)
        .fetch_one(&mut *conn)
        .await
    }

    /// Record a gateway-confirmed payment
    pub async fn mark_paid(
        conn: &mut PgConnection,
        order_id: Uuid,
        gateway_order_id: &str,
        gateway_payment_id: &str,
    ) -> Result<Order, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"
            UPDATE orders
            SET status = $2,
                payment_status = $3,
                gateway_order_id = $4,
                gateway_payment_id = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .bind(OrderStatus::Paid)
        .bind(PaymentStatus::Paid)
        .bind(gateway_order_id)
        .bind(gateway_payment_id)
        .fetch_one(&mut *conn)
        .await
    }

    /// A user's orders, newest first
    pub async fn list_by_user(
        conn: &mut PgConnection,
        user_id: i32,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {}
            FROM orders
            WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .bind(status)
        .bind(HISTORY_LIMIT)
        .fetch_all(&mut *conn)
        .await
    }

    /// A restaurant's queue, oldest first
    pub async fn list_by_restaurant(
        conn: &mut PgConnection,
        restaurant_id: i32,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, sqlx::Error> {
        sqlx::query_as::<_, Order>(&format!(
            r#"
            SELECT {}
            FROM orders
            WHERE restaurant_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at ASC
            LIMIT $3
            "#,
            ORDER_COLUMNS
        ))
        .bind(restaurant_id)
        .bind(status)
        .bind(HISTORY_LIMIT)
        .fetch_all(&mut *conn)
        .await
    }
}

/// Repository for order line snapshots
pub struct OrderItemsRepository;

impl OrderItemsRepository {
    pub async fn insert_lines(
        conn: &mut PgConnection,
        order_id: Uuid,
        lines: &[NewOrderLine],
    ) -> Result<Vec<OrderItemRow>, sqlx::Error> {
        let mut rows = Vec::with_capacity(lines.len());
        for line in lines {
            let row = sqlx::query_as::<_, OrderItemRow>(&format!(
                r#"
                INSERT INTO order_items (order_id, menu_item_id, name, variant_name, add_ons,
                                         quantity, unit_price, total_price)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING {}
                "#,
                ORDER_ITEM_COLUMNS
            ))
            .bind(order_id)
            .bind(line.menu_item_id)
            .bind(&line.name)
            .bind(&line.variant_name)
            .bind(Json(&line.add_ons))
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.total_price)
            .fetch_one(&mut *conn)
            .await?;
            rows.push(row);
        }
        Ok(rows)
    }

    pub async fn find_by_order_id(
        conn: &mut PgConnection,
        order_id: Uuid,
    ) -> Result<Vec<OrderItemRow>, sqlx::Error> {
        sqlx::query_as::<_, OrderItemRow>(&format!(
            "SELECT {} FROM order_items WHERE order_id = $1 ORDER BY id",
            ORDER_ITEM_COLUMNS
        ))
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await
    }

    pub async fn find_by_order_ids(
        conn: &mut PgConnection,
        order_ids: &[Uuid],
    ) -> Result<Vec<OrderItemRow>, sqlx::Error> {
        if order_ids.is_empty() {
            return Ok(vec![]);
        }
        sqlx::query_as::<_, OrderItemRow>(&format!(
            "SELECT {} FROM order_items WHERE order_id = ANY($1) ORDER BY order_id, id",
            ORDER_ITEM_COLUMNS
        ))
        .bind(order_ids)
        .fetch_all(&mut *conn)
        .await
    }
}
