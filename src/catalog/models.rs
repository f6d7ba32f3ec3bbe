use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use std::collections::HashMap;

/// Restaurant attributes consulted at checkout
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Restaurant {
    pub id: i32,
    pub owner_id: i32,
    pub name: String,
    pub is_active: bool,
    pub is_open: bool,
    pub min_order: Decimal,
    /// Minutes, used when an owner confirms without an explicit estimate
    pub default_preparation_time: i32,
}

impl Restaurant {
    /// Active and currently open
    pub fn accepts_orders(&self) -> bool {
        self.is_active && self.is_open
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct MenuItem {
    pub id: i32,
    pub restaurant_id: i32,
    pub name: String,
    pub price: Decimal,
    pub is_available: bool,
}

/// Size/flavour variant; its price replaces the item's base price
#[derive(Debug, Clone, FromRow)]
pub struct MenuItemVariant {
    pub id: i32,
    pub menu_item_id: i32,
    pub name: String,
    pub price: Decimal,
    pub is_available: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct MenuItemAddOn {
    pub id: i32,
    pub menu_item_id: i32,
    pub name: String,
    pub price: Decimal,
    pub is_available: bool,
}

/// Point-in-time view of the catalog rows a cart or order refers to
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    items: HashMap<i32, MenuItem>,
    variants: HashMap<i32, Vec<MenuItemVariant>>,
    add_ons: HashMap<i32, Vec<MenuItemAddOn>>,
}

impl CatalogSnapshot {
    pub fn from_parts(
        items: Vec<MenuItem>,
        variants: Vec<MenuItemVariant>,
        add_ons: Vec<MenuItemAddOn>,
    ) -> Self {
        let mut snapshot = CatalogSnapshot::default();
        for item in items {
            snapshot.items.insert(item.id, item);
        }
        for variant in variants {
            snapshot
                .variants
                .entry(variant.menu_item_id)
                .or_default()
                .push(variant);
        }
        for add_on in add_ons {
            snapshot
                .add_ons
                .entry(add_on.menu_item_id)
                .or_default()
                .push(add_on);
        }
        snapshot
    }

    pub fn item(&self, menu_item_id: i32) -> Option<&MenuItem> {
        self.items.get(&menu_item_id)
    }

    /// Variant by id, only if it belongs to the given item
    pub fn variant(&self, menu_item_id: i32, variant_id: i32) -> Option<&MenuItemVariant> {
        self.variants
            .get(&menu_item_id)?
            .iter()
            .find(|v| v.id == variant_id)
    }

    /// Variant by display name (case-insensitive); used when replaying order snapshots
    pub fn variant_by_name(&self, menu_item_id: i32, name: &str) -> Option<&MenuItemVariant> {
        self.variants
            .get(&menu_item_id)?
            .iter()
            .find(|v| names_match(&v.name, name))
    }

    /// Add-on by id, only if it belongs to the given item
    pub fn add_on(&self, menu_item_id: i32, add_on_id: i32) -> Option<&MenuItemAddOn> {
        self.add_ons
            .get(&menu_item_id)?
            .iter()
            .find(|a| a.id == add_on_id)
    }

    pub fn add_on_by_name(&self, menu_item_id: i32, name: &str) -> Option<&MenuItemAddOn> {
        self.add_ons
            .get(&menu_item_id)?
            .iter()
            .find(|a| names_match(&a.name, name))
    }
}

fn names_match(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}


#[cfg(test)]
mod tests {
    use super::fixtures::sample_snapshot;
    use super::*;

    #[test]
    fn test_variant_must_belong_to_item() {
        let snapshot = sample_snapshot();
        assert!(snapshot.variant(1, 10).is_some());
        assert!(snapshot.variant(2, 10).is_none());
    }

    #[test]
    fn test_lookup_by_name_ignores_case_and_padding() {
        let snapshot = sample_snapshot();
        assert_eq!(snapshot.variant_by_name(1, " large ").map(|v| v.id), Some(10));
        assert_eq!(snapshot.add_on_by_name(1, "extra cheese").map(|a| a.id), Some(20));
        assert!(snapshot.add_on_by_name(1, "Olives").is_none());
    }

    #[test]
    fn test_restaurant_accepts_orders() {
        let mut restaurant = Restaurant {
            id: 1,
            owner_id: 2,
            name: "Wrap House".into(),
            is_active: true,
            is_open: true,
            min_order: Decimal::ZERO,
            default_preparation_time: 15,
        };
        assert!(restaurant.accepts_orders());
        restaurant.is_open = false;
        assert!(!restaurant.accepts_orders());
    }
}
