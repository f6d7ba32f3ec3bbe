use rust_decimal::Decimal;

use crate::catalog::CatalogSnapshot;
use crate::money::round2;
use crate::pricing::{
    AddOnSnapshot, PricedCart, PricedLine, PricingInput, UnavailableLine, UnavailableReason,
};

/// Pure pricing over a catalog snapshot
pub struct PricingEngine;

impl PricingEngine {
    /// Unit price: variant price (or item base price) plus add-on snapshot prices
    pub fn unit_price(base_price: Decimal, add_ons: &[AddOnSnapshot]) -> Decimal {
        let add_on_total: Decimal = add_ons.iter().map(|a| a.price).sum();
        round2(base_price + add_on_total)
    }

    /// Line total: unit price × quantity
    pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
        round2(unit_price * Decimal::from(quantity))
    }

    /// Subtotal: sum of line totals
    pub fn subtotal(line_totals: &[Decimal]) -> Decimal {
        round2(line_totals.iter().sum())
    }

    /// Price every line of a cart pinned to `restaurant_id`
    ///
    /// Lines whose item or variant is gone or unavailable are left out of the
    /// subtotal and reported in `unavailable`; the caller decides whether that
    /// blocks checkout.
    pub fn price_lines(
        restaurant_id: i32,
        inputs: &[PricingInput],
        snapshot: &CatalogSnapshot,
    ) -> PricedCart {
        let mut cart = PricedCart::default();

        for input in inputs {
            match Self::price_line(restaurant_id, input, snapshot) {
                Ok(line) => cart.lines.push(line),
                Err(reason) => cart.unavailable.push(UnavailableLine {
                    line_id: input.line_id,
                    menu_item_id: input.menu_item_id,
                    reason,
                }),
            }
        }

        let totals: Vec<Decimal> = cart.lines.iter().map(|l| l.total_price).collect();
        cart.subtotal = Self::subtotal(&totals);
        cart
    }

    fn price_line(
        restaurant_id: i32,
        input: &PricingInput,
        snapshot: &CatalogSnapshot,
    ) -> Result<PricedLine, UnavailableReason> {
        let item = snapshot
            .item(input.menu_item_id)
            .ok_or(UnavailableReason::ItemMissing)?;
        if item.restaurant_id != restaurant_id {
            return Err(UnavailableReason::WrongRestaurant);
        }
        if !item.is_available {
            return Err(UnavailableReason::ItemUnavailable);
        }

        let (base_price, variant_name) = match input.variant_id {
            Some(variant_id) => {
                let variant = snapshot
                    .variant(item.id, variant_id)
                    .ok_or(UnavailableReason::VariantMissing)?;
                if !variant.is_available {
                    return Err(UnavailableReason::VariantUnavailable);
                }
                (variant.price, Some(variant.name.clone()))
            }
            None => (item.price, None),
        };

        let unit_price = Self::unit_price(base_price, &input.add_ons);
        Ok(PricedLine {
            line_id: input.line_id,
            menu_item_id: item.id,
            name: item.name.clone(),
            variant_id: input.variant_id,
            variant_name,
            add_ons: input.add_ons.clone(),
            quantity: input.quantity,
            unit_price,
            total_price: Self::line_total(unit_price, input.quantity),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::models::fixtures::sample_snapshot;
    use rust_decimal_macros::dec;

    fn input(line_id: i32, menu_item_id: i32, variant_id: Option<i32>, quantity: i32) -> PricingInput {
        PricingInput {
            line_id,
            menu_item_id,
            variant_id,
            add_ons: vec![],
            quantity,
        }
    }

    fn cheese() -> AddOnSnapshot {
        AddOnSnapshot { id: 20, name: "Extra Cheese".into(), price: dec!(25.00) }
    }

    #[test]
    fn test_base_price_line() {
        let cart = PricingEngine::price_lines(1, &[input(1, 2, None, 3)], &sample_snapshot());
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].unit_price, dec!(30.00));
        assert_eq!(cart.lines[0].total_price, dec!(90.00));
        assert_eq!(cart.subtotal, dec!(90.00));
    }

    #[test]
    fn test_variant_overrides_base_price_and_add_ons_stack() {
        let mut line = input(1, 1, Some(10), 2);
        line.add_ons = vec![cheese()];
        let cart = PricingEngine::price_lines(1, &[line], &sample_snapshot());

        let priced = &cart.lines[0];
        assert_eq!(priced.variant_name.as_deref(), Some("Large"));
        assert_eq!(priced.unit_price, dec!(185.00));
        assert_eq!(priced.total_price, dec!(370.00));
    }

    #[test]
    fn test_add_on_snapshot_price_is_used_not_catalog_price() {
        let mut line = input(1, 1, None, 1);
        line.add_ons = vec![AddOnSnapshot { id: 20, name: "Extra Cheese".into(), price: dec!(5.00) }];
        let cart = PricingEngine::price_lines(1, &[line], &sample_snapshot());
        assert_eq!(cart.subtotal, dec!(125.00));
    }

    #[test]
    fn test_unavailable_lines_are_excluded_and_reported() {
        let lines = vec![
            input(1, 1, None, 1),
            input(2, 3, None, 1),
            input(3, 1, Some(11), 1),
            input(4, 1, Some(99), 1),
            input(5, 404, None, 1),
            input(6, 9, None, 1),
        ];
        let cart = PricingEngine::price_lines(1, &lines, &sample_snapshot());

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.subtotal, dec!(120.00));
        let reasons: Vec<UnavailableReason> = cart.unavailable.iter().map(|u| u.reason).collect();
        assert_eq!(
            reasons,
            vec![
                UnavailableReason::ItemUnavailable,
                UnavailableReason::VariantUnavailable,
                UnavailableReason::VariantMissing,
                UnavailableReason::ItemMissing,
                UnavailableReason::WrongRestaurant,
            ]
        );
        assert!(!cart.is_fully_available());
    }

    #[test]
    fn test_rounding_at_each_step() {
        let add_ons = vec![AddOnSnapshot { id: 1, name: "Dip".into(), price: dec!(0.335) }];
        let unit = PricingEngine::unit_price(dec!(10.00), &add_ons);
        assert_eq!(unit, dec!(10.34));
        assert_eq!(PricingEngine::line_total(unit, 3), dec!(31.02));
    }

    #[test]
    fn test_empty_cart_prices_to_zero() {
        let cart = PricingEngine::price_lines(1, &[], &sample_snapshot());
        assert_eq!(cart.subtotal, Decimal::ZERO);
        assert!(cart.is_fully_available());
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    /// Subtotal always equals the sum of the priced line totals and is never negative
    #[test]
    fn prop_subtotal_is_sum_of_line_totals() {
        proptest!(|(
            prices_cents in prop::collection::vec(0u32..=100_000u32, 0..=15),
            quantities in prop::collection::vec(1i32..=50, 15)
        )| {
            let totals: Vec<Decimal> = prices_cents
                .iter()
                .zip(quantities.iter())
                .map(|(&cents, &qty)| {
                    let unit = PricingEngine::unit_price(Decimal::new(cents as i64, 2), &[]);
                    PricingEngine::line_total(unit, qty)
                })
                .collect();

            let subtotal = PricingEngine::subtotal(&totals);
            let expected: Decimal = totals.iter().sum();
            prop_assert_eq!(subtotal, expected);
            prop_assert!(subtotal >= Decimal::ZERO);
            prop_assert!(subtotal.scale() <= 2);
        });
    }

    /// Unit price is monotone in the add-on set
    #[test]
    fn prop_add_ons_never_lower_unit_price() {
        proptest!(|(
            base_cents in 0u32..=50_000u32,
            add_on_cents in prop::collection::vec(0u32..=5_000u32, 0..=5)
        )| {
            let base = Decimal::new(base_cents as i64, 2);
            let add_ons: Vec<AddOnSnapshot> = add_on_cents
                .iter()
                .enumerate()
                .map(|(i, &cents)| AddOnSnapshot {
                    id: i as i32,
                    name: format!("add-on {}", i),
                    price: Decimal::new(cents as i64, 2),
                })
                .collect();
            prop_assert!(PricingEngine::unit_price(base, &add_ons) >= base);
        });
    }
}
