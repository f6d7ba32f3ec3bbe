use sqlx::types::Json;
use sqlx::PgConnection;

use crate::cart::{Cart, CartItem, NewCartLine, MAX_LINE_QUANTITY};

/// Cart and cart line persistence; every call runs on the caller's connection
pub struct CartRepository;

impl CartRepository {
    pub async fn find_by_user(
        conn: &mut PgConnection,
        user_id: i32,
    ) -> Result<Option<Cart>, sqlx::Error> {
        sqlx::query_as::<_, Cart>("SELECT id, user_id, restaurant_id FROM carts WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Lock the user's cart row for the rest of the transaction
    pub async fn lock_by_user(
        conn: &mut PgConnection,
        user_id: i32,
    ) -> Result<Option<Cart>, sqlx::Error> {
        sqlx::query_as::<_, Cart>(
            "SELECT id, user_id, restaurant_id FROM carts WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await
    }

    /// Create the cart row if the user has none; an existing row is left untouched
    pub async fn insert_if_absent(
        conn: &mut PgConnection,
        user_id: i32,
        restaurant_id: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO carts (user_id, restaurant_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(restaurant_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn repin(
        conn: &mut PgConnection,
        cart_id: i32,
        restaurant_id: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE carts SET restaurant_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(cart_id)
            .bind(restaurant_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn count_items(conn: &mut PgConnection, cart_id: i32) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn list_items(
        conn: &mut PgConnection,
        cart_id: i32,
    ) -> Result<Vec<CartItem>, sqlx::Error> {
        sqlx::query_as::<_, CartItem>(
            r#"
            SELECT id, cart_id, menu_item_id, variant_id, add_ons, quantity
            FROM cart_items
            WHERE cart_id = $1
            ORDER BY id
            "#,
        )
        .bind(cart_id)
        .fetch_all(&mut *conn)
        .await
    }

    /// Insert a line, or add to the quantity of the line with the same fingerprint
    ///
    /// The merged quantity saturates at `MAX_LINE_QUANTITY`.
    pub async fn upsert_line(
        conn: &mut PgConnection,
        cart_id: i32,
        line: &NewCartLine,
    ) -> Result<CartItem, sqlx::Error> {
        sqlx::query_as::<_, CartItem>(
            r#"
            INSERT INTO cart_items (cart_id, menu_item_id, variant_id, add_ons, add_on_key, quantity)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (cart_id, menu_item_id, (COALESCE(variant_id, 0)), add_on_key)
            DO UPDATE SET quantity = LEAST(cart_items.quantity + EXCLUDED.quantity, $7),
                          updated_at = NOW()
            RETURNING id, cart_id, menu_item_id, variant_id, add_ons, quantity
            "#,
        )
        .bind(cart_id)
        .bind(line.menu_item_id)
        .bind(line.variant_id)
        .bind(Json(&line.add_ons))
        .bind(line.add_on_key())
        .bind(line.quantity)
        .bind(MAX_LINE_QUANTITY)
        .fetch_one(&mut *conn)
        .await
    }

    /// Set a line's quantity; returns false if the line is not in the user's cart
    pub async fn set_quantity(
        conn: &mut PgConnection,
        user_id: i32,
        line_id: i32,
        quantity: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE cart_items ci
            SET quantity = $3, updated_at = NOW()
            FROM carts c
            WHERE ci.id = $2 AND ci.cart_id = c.id AND c.user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(line_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a line; returns false if the line is not in the user's cart
    pub async fn delete_line(
        conn: &mut PgConnection,
        user_id: i32,
        line_id: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM cart_items ci
            USING carts c
            WHERE ci.id = $2 AND ci.cart_id = c.id AND c.user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(line_id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete the cart's lines and the cart row itself
    pub async fn delete_cart(conn: &mut PgConnection, cart_id: i32) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut *conn)
            .await?;
        sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(cart_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
