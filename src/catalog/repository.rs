use sqlx::PgConnection;

use crate::catalog::{CatalogSnapshot, MenuItem, MenuItemAddOn, MenuItemVariant, Restaurant};

/// Read-only access to restaurants
pub struct RestaurantRepository;

impl RestaurantRepository {
    pub async fn find_by_id(
        conn: &mut PgConnection,
        restaurant_id: i32,
    ) -> Result<Option<Restaurant>, sqlx::Error> {
        sqlx::query_as::<_, Restaurant>(
            r#"
            SELECT id, owner_id, name, is_active, is_open, min_order, default_preparation_time
            FROM restaurants
            WHERE id = $1
            "#,
        )
        .bind(restaurant_id)
        .fetch_optional(&mut *conn)
        .await
    }
}

/// Read-only access to menu items, variants and add-ons
pub struct CatalogRepository;

impl CatalogRepository {
    /// Load the given menu items together with all of their variants and add-ons
    pub async fn load_snapshot(
        conn: &mut PgConnection,
        menu_item_ids: &[i32],
    ) -> Result<CatalogSnapshot, sqlx::Error> {
        if menu_item_ids.is_empty() {
            return Ok(CatalogSnapshot::default());
        }

        let items = sqlx::query_as::<_, MenuItem>(
            r#"
            SELECT id, restaurant_id, name, price, is_available
            FROM menu_items
            WHERE id = ANY($1)
            "#,
        )
        .bind(menu_item_ids)
        .fetch_all(&mut *conn)
        .await?;

        let variants = sqlx::query_as::<_, MenuItemVariant>(
            r#"
            SELECT id, menu_item_id, name, price, is_available
            FROM menu_item_variants
            WHERE menu_item_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(menu_item_ids)
        .fetch_all(&mut *conn)
        .await?;

        let add_ons = sqlx::query_as::<_, MenuItemAddOn>(
            r#"
            SELECT id, menu_item_id, name, price, is_available
            FROM menu_item_add_ons
            WHERE menu_item_id = ANY($1)
            ORDER BY id
            "#,
        )
        .bind(menu_item_ids)
        .fetch_all(&mut *conn)
        .await?;

        tracing::debug!(
            "Loaded catalog snapshot: {} items, {} variants, {} add-ons",
            items.len(),
            variants.len(),
            add_ons.len()
        );
        Ok(CatalogSnapshot::from_parts(items, variants, add_ons))
    }
}
