use sqlx::{PgConnection, PgPool};

use crate::cart::{
    AddToCartRequest, Cart, CartError, CartItem, CartRepository, CartView, NewCartLine,
};
use crate::catalog::{CatalogRepository, CatalogSnapshot};
use crate::pricing::{AddOnSnapshot, PricedCart, PricingEngine, PricingInput};

/// Service for cart business logic
#[derive(Clone)]
pub struct CartService {
    pool: PgPool,
}

impl CartService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Priced view of the user's cart
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, user_id: i32) -> Result<CartView, CartError> {
        let mut conn = self.pool.acquire().await?;
        load_view(&mut conn, user_id).await
    }

    /// Validate an item against the catalog and merge it into the cart
    #[tracing::instrument(skip(self, request), fields(menu_item_id = request.menu_item_id))]
    pub async fn add_to_cart(
        &self,
        user_id: i32,
        request: AddToCartRequest,
    ) -> Result<CartView, CartError> {
        let mut tx = self.pool.begin().await?;

        let snapshot = CatalogRepository::load_snapshot(&mut tx, &[request.menu_item_id]).await?;
        let line = resolve_line(&snapshot, &request)?;
        let item = add_line(&mut tx, user_id, &line).await?;
        let view = load_view(&mut tx, user_id).await?;

        tx.commit().await?;
        tracing::info!(
            "Cart line {} now has quantity {} for user {}",
            item.id,
            item.quantity,
            user_id
        );
        Ok(view)
    }

    /// Change a line's quantity; zero removes it
    #[tracing::instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        user_id: i32,
        line_id: i32,
        quantity: i32,
    ) -> Result<CartView, CartError> {
        if quantity == 0 {
            return self.remove_line(user_id, line_id).await;
        }

        let mut conn = self.pool.acquire().await?;
        if !CartRepository::set_quantity(&mut conn, user_id, line_id, quantity).await? {
            return Err(CartError::LineNotFound(line_id));
        }
        load_view(&mut conn, user_id).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_line(&self, user_id: i32, line_id: i32) -> Result<CartView, CartError> {
        let mut conn = self.pool.acquire().await?;
        if !CartRepository::delete_line(&mut conn, user_id, line_id).await? {
            return Err(CartError::LineNotFound(line_id));
        }
        load_view(&mut conn, user_id).await
    }

    /// Drop every line and the cart row
    #[tracing::instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: i32) -> Result<(), CartError> {
        let mut tx = self.pool.begin().await?;
        if let Some(cart) = CartRepository::lock_by_user(&mut tx, user_id).await? {
            CartRepository::delete_cart(&mut tx, cart.id).await?;
        }
        tx.commit().await?;
        tracing::debug!("Cleared cart for user {}", user_id);
        Ok(())
    }
}

/// Check a requested line against the catalog and capture its add-on snapshots
pub fn resolve_line(
    snapshot: &CatalogSnapshot,
    request: &AddToCartRequest,
) -> Result<NewCartLine, CartError> {
    let item = snapshot
        .item(request.menu_item_id)
        .ok_or(CartError::ItemNotFound(request.menu_item_id))?;
    if !item.is_available {
        return Err(CartError::ItemUnavailable(item.name.clone()));
    }

    if let Some(variant_id) = request.variant_id {
        let variant = snapshot
            .variant(item.id, variant_id)
            .ok_or(CartError::InvalidVariant {
                menu_item_id: item.id,
                variant_id,
            })?;
        if !variant.is_available {
            return Err(CartError::ItemUnavailable(format!("{} ({})", item.name, variant.name)));
        }
    }

    let mut ids = request.add_on_ids.clone();
    ids.sort_unstable();
    ids.dedup();

    let mut add_ons = Vec::with_capacity(ids.len());
    for add_on_id in ids {
        let add_on = snapshot
            .add_on(item.id, add_on_id)
            .ok_or(CartError::InvalidAddOn {
                menu_item_id: item.id,
                add_on_id,
            })?;
        if !add_on.is_available {
            return Err(CartError::ItemUnavailable(add_on.name.clone()));
        }
        add_ons.push(AddOnSnapshot {
            id: add_on.id,
            name: add_on.name.clone(),
            price: add_on.price,
        });
    }

    Ok(NewCartLine {
        restaurant_id: item.restaurant_id,
        menu_item_id: item.id,
        variant_id: request.variant_id,
        add_ons,
        quantity: request.quantity,
    })
}

/// Lock the user's cart, pinning it to `restaurant_id`
///
/// A cart that still holds lines from another restaurant is rejected; an empty
/// one is re-pinned.
pub async fn pin_cart(
    conn: &mut PgConnection,
    user_id: i32,
    restaurant_id: i32,
) -> Result<Cart, CartError> {
    CartRepository::insert_if_absent(conn, user_id, restaurant_id).await?;
    let mut cart = CartRepository::lock_by_user(conn, user_id)
        .await?
        .ok_or(sqlx::Error::RowNotFound)?;

    if cart.restaurant_id != restaurant_id {
        if CartRepository::count_items(conn, cart.id).await? > 0 {
            tracing::warn!(
                "User {} tried to mix restaurants {} and {} in one cart",
                user_id,
                cart.restaurant_id,
                restaurant_id
            );
            return Err(CartError::CrossRestaurant {
                current: cart.restaurant_id,
                requested: restaurant_id,
            });
        }
        CartRepository::repin(conn, cart.id, restaurant_id).await?;
        cart.restaurant_id = restaurant_id;
    }
    Ok(cart)
}

/// Merge a resolved line into the user's cart within the caller's transaction
pub async fn add_line(
    conn: &mut PgConnection,
    user_id: i32,
    line: &NewCartLine,
) -> Result<CartItem, CartError> {
    let cart = pin_cart(conn, user_id, line.restaurant_id).await?;
    Ok(CartRepository::upsert_line(conn, cart.id, line).await?)
}

/// Price the given cart lines against the live catalog
pub async fn price_cart(
    conn: &mut PgConnection,
    cart: &Cart,
    items: &[CartItem],
) -> Result<PricedCart, sqlx::Error> {
    let menu_item_ids: Vec<i32> = items.iter().map(|i| i.menu_item_id).collect();
    let snapshot = CatalogRepository::load_snapshot(conn, &menu_item_ids).await?;
    let inputs: Vec<PricingInput> = items.iter().map(PricingInput::from).collect();
    Ok(PricingEngine::price_lines(cart.restaurant_id, &inputs, &snapshot))
}

/// Priced view of the user's cart on the caller's connection
pub async fn load_view(conn: &mut PgConnection, user_id: i32) -> Result<CartView, CartError> {
    let Some(cart) = CartRepository::find_by_user(conn, user_id).await? else {
        return Ok(CartView::empty());
    };
    let items = CartRepository::list_items(conn, cart.id).await?;
    let priced = price_cart(conn, &cart, &items).await?;
    Ok(CartView::priced(&cart, priced))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::models::fixtures::sample_snapshot;
    use rust_decimal_macros::dec;

    fn request(menu_item_id: i32, variant_id: Option<i32>, add_on_ids: Vec<i32>) -> AddToCartRequest {
        AddToCartRequest {
            menu_item_id,
            variant_id,
            add_on_ids,
            quantity: 1,
        }
    }

    #[test]
    fn test_resolve_line_snapshots_add_ons_sorted() {
        let line = resolve_line(&sample_snapshot(), &request(1, Some(10), vec![21, 20, 21])).unwrap();
        assert_eq!(line.restaurant_id, 1);
        assert_eq!(line.add_on_key(), "20,21");
        assert_eq!(line.add_ons[0].name, "Extra Cheese");
        assert_eq!(line.add_ons[1].price, dec!(15.50));
    }

    #[test]
    fn test_resolve_line_same_fingerprint_regardless_of_pick_order() {
        let snapshot = sample_snapshot();
        let a = resolve_line(&snapshot, &request(1, None, vec![20, 21])).unwrap();
        let b = resolve_line(&snapshot, &request(1, None, vec![21, 20])).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_resolve_line_rejects_unknown_item() {
        let result = resolve_line(&sample_snapshot(), &request(404, None, vec![]));
        assert!(matches!(result, Err(CartError::ItemNotFound(404))));
    }

    #[test]
    fn test_resolve_line_rejects_unavailable_item_and_variant() {
        let snapshot = sample_snapshot();
        assert!(matches!(
            resolve_line(&snapshot, &request(3, None, vec![])),
            Err(CartError::ItemUnavailable(_))
        ));
        assert!(matches!(
            resolve_line(&snapshot, &request(1, Some(11), vec![])),
            Err(CartError::ItemUnavailable(_))
        ));
    }

    #[test]
    fn test_resolve_line_rejects_foreign_variant_and_add_on() {
        let snapshot = sample_snapshot();
        assert!(matches!(
            resolve_line(&snapshot, &request(2, Some(10), vec![])),
            Err(CartError::InvalidVariant { menu_item_id: 2, variant_id: 10 })
        ));
        assert!(matches!(
            resolve_line(&snapshot, &request(2, None, vec![20])),
            Err(CartError::InvalidAddOn { menu_item_id: 2, add_on_id: 20 })
        ));
    }

    #[test]
    fn test_resolve_line_rejects_unavailable_add_on() {
        let result = resolve_line(&sample_snapshot(), &request(2, None, vec![22]));
        assert!(matches!(result, Err(CartError::ItemUnavailable(name)) if name == "Honey"));
    }
}
