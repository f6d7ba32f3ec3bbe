use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Add-on captured at the moment a line was added to the cart
///
/// The same shape is persisted on cart lines and order lines; the price is
/// never re-read from the catalog afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AddOnSnapshot {
    pub id: i32,
    pub name: String,
    pub price: Decimal,
}

/// One cart line as the pricing engine sees it
#[derive(Debug, Clone)]
pub struct PricingInput {
    pub line_id: i32,
    pub menu_item_id: i32,
    pub variant_id: Option<i32>,
    pub add_ons: Vec<AddOnSnapshot>,
    pub quantity: i32,
}

/// Line priced against the live catalog
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PricedLine {
    pub line_id: i32,
    pub menu_item_id: i32,
    pub name: String,
    pub variant_id: Option<i32>,
    pub variant_name: Option<String>,
    pub add_ons: Vec<AddOnSnapshot>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    ItemMissing,
    ItemUnavailable,
    VariantMissing,
    VariantUnavailable,
    /// Item now belongs to a different restaurant than the cart
    WrongRestaurant,
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            UnavailableReason::ItemMissing => "menu item no longer exists",
            UnavailableReason::ItemUnavailable => "menu item is unavailable",
            UnavailableReason::VariantMissing => "variant no longer exists",
            UnavailableReason::VariantUnavailable => "variant is unavailable",
            UnavailableReason::WrongRestaurant => "menu item belongs to another restaurant",
        };
        f.write_str(text)
    }
}

/// Line excluded from pricing
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UnavailableLine {
    pub line_id: i32,
    pub menu_item_id: i32,
    pub reason: UnavailableReason,
}

/// Result of pricing a whole cart
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct PricedCart {
    pub lines: Vec<PricedLine>,
    pub unavailable: Vec<UnavailableLine>,
    pub subtotal: Decimal,
}

impl PricedCart {
    pub fn is_fully_available(&self) -> bool {
        self.unavailable.is_empty()
    }
}
