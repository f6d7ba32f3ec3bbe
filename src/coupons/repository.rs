use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::coupons::{Coupon, CouponUsage, CreateCouponRequest};
use crate::outbox::COUPON_USAGE_KIND;

const COUPON_COLUMNS: &str = "id, code, discount_type, discount_value, max_discount, min_order, \
     usage_limit, used_count, per_user_limit, is_active, expires_at, created_at";

/// Coupon and redemption persistence
pub struct CouponRepository;

impl CouponRepository {
    /// Look up a coupon by its normalized code
    pub async fn find_by_code(
        conn: &mut PgConnection,
        code: &str,
    ) -> Result<Option<Coupon>, sqlx::Error> {
        sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {} FROM coupons WHERE code = $1",
            COUPON_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&mut *conn)
        .await
    }

    /// Lock a coupon row for the rest of the transaction
    ///
    /// Checkouts redeeming the same coupon queue here, so each one counts
    /// redemptions committed by the checkouts ahead of it.
    pub async fn lock_by_code(
        conn: &mut PgConnection,
        code: &str,
    ) -> Result<Option<Coupon>, sqlx::Error> {
        sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {} FROM coupons WHERE code = $1 FOR UPDATE",
            COUPON_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&mut *conn)
        .await
    }

    /// Redemption counts for the caps
    ///
    /// The per-user count comes from the redemption ledger; redemptions queued
    /// in the outbox by already-committed orders are counted as well.
    pub async fn usage(
        conn: &mut PgConnection,
        coupon_id: i32,
        user_id: i32,
    ) -> Result<CouponUsage, sqlx::Error> {
        sqlx::query_as::<_, CouponUsage>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM coupon_redemptions
                  WHERE coupon_id = $1 AND user_id = $2) AS user_redemptions,
                (SELECT COUNT(*) FROM outbox_tasks
                  WHERE kind = $3 AND status <> 'done'
                    AND (payload->>'coupon_id')::int = $1) AS pending_total,
                (SELECT COUNT(*) FROM outbox_tasks
                  WHERE kind = $3 AND status <> 'done'
                    AND (payload->>'coupon_id')::int = $1
                    AND (payload->>'user_id')::int = $2) AS pending_user
            "#,
        )
        .bind(coupon_id)
        .bind(user_id)
        .bind(COUPON_USAGE_KIND)
        .fetch_one(&mut *conn)
        .await
    }

    /// Insert the redemption row and bump `used_count` in one statement
    ///
    /// Returns false when this (coupon, order) pair was already recorded.
    pub async fn record_usage(
        conn: &mut PgConnection,
        coupon_id: i32,
        user_id: i32,
        order_id: Uuid,
        discount_amount: Decimal,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            WITH inserted AS (
                INSERT INTO coupon_redemptions (coupon_id, user_id, order_id, discount_amount)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (coupon_id, order_id) DO NOTHING
                RETURNING coupon_id
            )
            UPDATE coupons
            SET used_count = used_count + 1
            WHERE id IN (SELECT coupon_id FROM inserted)
            "#,
        )
        .bind(coupon_id)
        .bind(user_id)
        .bind(order_id)
        .bind(discount_amount)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn insert(
        conn: &mut PgConnection,
        code: &str,
        request: &CreateCouponRequest,
    ) -> Result<Coupon, sqlx::Error> {
        sqlx::query_as::<_, Coupon>(&format!(
            r#"
            INSERT INTO coupons (code, discount_type, discount_value, max_discount, min_order,
                                 usage_limit, per_user_limit, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            COUPON_COLUMNS
        ))
        .bind(code)
        .bind(request.discount_type)
        .bind(request.discount_value)
        .bind(request.max_discount)
        .bind(request.min_order)
        .bind(request.usage_limit)
        .bind(request.per_user_limit)
        .bind(request.expires_at)
        .fetch_one(&mut *conn)
        .await
    }

    pub async fn list(conn: &mut PgConnection) -> Result<Vec<Coupon>, sqlx::Error> {
        sqlx::query_as::<_, Coupon>(&format!(
            "SELECT {} FROM coupons ORDER BY created_at DESC",
            COUPON_COLUMNS
        ))
        .fetch_all(&mut *conn)
        .await
    }
}
