use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::pricing::{AddOnSnapshot, PricedCart, PricedLine, PricingInput, UnavailableLine};

/// Cart row; exists while the user has (or had, since the last clear) items
#[derive(Debug, Clone, FromRow)]
pub struct Cart {
    pub id: i32,
    pub user_id: i32,
    pub restaurant_id: i32,
}

/// Cart line as stored, with its add-on snapshots
#[derive(Debug, Clone, FromRow)]
pub struct CartItem {
    pub id: i32,
    pub cart_id: i32,
    pub menu_item_id: i32,
    pub variant_id: Option<i32>,
    pub add_ons: Json<Vec<AddOnSnapshot>>,
    pub quantity: i32,
}

impl From<&CartItem> for PricingInput {
    fn from(item: &CartItem) -> Self {
        PricingInput {
            line_id: item.id,
            menu_item_id: item.menu_item_id,
            variant_id: item.variant_id,
            add_ons: item.add_ons.0.clone(),
            quantity: item.quantity,
        }
    }
}

/// Upper bound for a single line, including merged adds
pub const MAX_LINE_QUANTITY: i32 = 99;

/// Fully resolved line ready to be merged into a cart
#[derive(Debug, Clone, PartialEq)]
pub struct NewCartLine {
    pub restaurant_id: i32,
    pub menu_item_id: i32,
    pub variant_id: Option<i32>,
    /// Sorted by add-on id
    pub add_ons: Vec<AddOnSnapshot>,
    pub quantity: i32,
}

impl NewCartLine {
    /// Deduplication key over the add-on set: sorted, comma-joined ids
    pub fn add_on_key(&self) -> String {
        add_on_key(self.add_ons.iter().map(|a| a.id))
    }
}

/// Order-independent fingerprint of an add-on id set
pub fn add_on_key(ids: impl IntoIterator<Item = i32>) -> String {
    let mut ids: Vec<i32> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Request body for adding an item to the cart
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddToCartRequest {
    pub menu_item_id: i32,
    pub variant_id: Option<i32>,
    #[serde(default)]
    #[validate(length(max = 20, message = "At most 20 add-ons per item"))]
    pub add_on_ids: Vec<i32>,
    #[validate(range(min = 1, max = 99, message = "Quantity must be between 1 and 99"))]
    pub quantity: i32,
}

/// Request body for changing a line's quantity; 0 removes the line
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateCartItemRequest {
    #[validate(range(min = 0, max = 99, message = "Quantity must be between 0 and 99"))]
    pub quantity: i32,
}

/// Priced view of the caller's cart
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CartView {
    pub cart_id: Option<i32>,
    pub restaurant_id: Option<i32>,
    pub items: Vec<PricedLine>,
    /// Lines excluded from the subtotal because the catalog changed under them
    pub unavailable: Vec<UnavailableLine>,
    pub subtotal: Decimal,
}

impl CartView {
    pub fn empty() -> Self {
        CartView {
            cart_id: None,
            restaurant_id: None,
            items: vec![],
            unavailable: vec![],
            subtotal: Decimal::ZERO,
        }
    }

    pub fn priced(cart: &Cart, priced: PricedCart) -> Self {
        CartView {
            cart_id: Some(cart.id),
            restaurant_id: Some(cart.restaurant_id),
            items: priced.lines,
            unavailable: priced.unavailable,
            subtotal: priced.subtotal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_on_key_is_sorted_and_deduplicated() {
        assert_eq!(add_on_key(vec![21, 20, 21]), "20,21");
        assert_eq!(add_on_key(Vec::<i32>::new()), "");
    }

    #[test]
    fn test_add_to_cart_validation() {
        let request = AddToCartRequest {
            menu_item_id: 1,
            variant_id: None,
            add_on_ids: vec![],
            quantity: 0,
        };
        assert!(request.validate().is_err());

        let request = AddToCartRequest { quantity: 2, ..request };
        assert!(request.validate().is_ok());
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    /// Fingerprint does not depend on the order add-ons were picked in
    #[test]
    fn prop_add_on_key_is_order_independent() {
        proptest!(|(ids in prop::collection::vec(1i32..=500, 0..=8))| {
            let mut reversed = ids.clone();
            reversed.reverse();
            prop_assert_eq!(add_on_key(ids.clone()), add_on_key(reversed));
        });
    }
}
