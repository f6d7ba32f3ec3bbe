use rust_decimal::Decimal;

use crate::money::{non_negative, round2};

/// Monetary fields of a new order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub wallet_amount_used: Decimal,
}

/// Service for settling checkout totals
pub struct PriceCalculator;

impl PriceCalculator {
    /// Settle the order amounts
    ///
    /// # Arguments
    /// * `subtotal` - Priced cart subtotal
    /// * `discount` - Coupon discount (already clamped by the coupon rules)
    /// * `wallet_balance` - Locked wallet balance when the customer pays from the wallet
    ///
    /// # Returns
    /// `total = subtotal - discount` (never negative) and
    /// `wallet_amount_used = min(balance, total)`
    pub fn settle(
        subtotal: Decimal,
        discount: Decimal,
        wallet_balance: Option<Decimal>,
    ) -> OrderTotals {
        let subtotal = non_negative(subtotal);
        let discount_amount = round2(discount.max(Decimal::ZERO).min(subtotal));
        let total_amount = non_negative(subtotal - discount_amount);
        let wallet_amount_used = wallet_balance
            .map(|balance| non_negative(balance.min(total_amount)))
            .unwrap_or(Decimal::ZERO);

        OrderTotals {
            subtotal,
            discount_amount,
            total_amount,
            wallet_amount_used,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_coupon_and_wallet_scenario() {
        let totals = PriceCalculator::settle(dec!(500.00), dec!(50.00), Some(dec!(1000.00)));
        assert_eq!(totals.discount_amount, dec!(50.00));
        assert_eq!(totals.total_amount, dec!(450.00));
        assert_eq!(totals.wallet_amount_used, dec!(450.00));
    }

    #[test]
    fn test_wallet_partially_covers_total() {
        let totals = PriceCalculator::settle(dec!(300.00), Decimal::ZERO, Some(dec!(120.55)));
        assert_eq!(totals.total_amount, dec!(300.00));
        assert_eq!(totals.wallet_amount_used, dec!(120.55));
    }

    #[test]
    fn test_no_wallet_requested() {
        let totals = PriceCalculator::settle(dec!(300.00), Decimal::ZERO, None);
        assert_eq!(totals.wallet_amount_used, Decimal::ZERO);
    }

    #[test]
    fn test_discount_larger_than_subtotal_is_clamped() {
        let totals = PriceCalculator::settle(dec!(80.00), dec!(100.00), Some(dec!(10.00)));
        assert_eq!(totals.discount_amount, dec!(80.00));
        assert_eq!(totals.total_amount, Decimal::ZERO);
        assert_eq!(totals.wallet_amount_used, Decimal::ZERO);
    }
}
