use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary amount to 2 decimal places, half away from zero
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `max(0, amount)` rounded to 2 dp
pub fn non_negative(amount: Decimal) -> Decimal {
    round2(amount.max(Decimal::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round2_half_away_from_zero() {
        assert_eq!(round2(dec!(1.005)), dec!(1.01));
        assert_eq!(round2(dec!(1.004)), dec!(1.00));
        assert_eq!(round2(dec!(12.5)), dec!(12.50));
    }

    #[test]
    fn test_non_negative_clamps() {
        assert_eq!(non_negative(dec!(-3.2)), Decimal::ZERO);
        assert_eq!(non_negative(dec!(3.333)), dec!(3.33));
    }
}
