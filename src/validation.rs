// Validation utilities module
// Custom validator functions for money amounts and coupon codes

use regex::Regex;
use rust_decimal::Decimal;
use std::sync::OnceLock;
use validator::ValidationError;

/// Largest single wallet credit or coupon value accepted over the API
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(10_000_000, 0, 0, false, 2);

fn coupon_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z0-9_-]{3,32}$").expect("coupon code pattern is valid"))
}

/// Validates that an amount is positive, has at most 2 decimal places and stays under the cap
pub fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount <= Decimal::ZERO {
        return Err(ValidationError::new("amount_must_be_positive"));
    }
    if amount.normalize().scale() > 2 {
        return Err(ValidationError::new("amount_too_precise"));
    }
    if *amount > MAX_AMOUNT {
        return Err(ValidationError::new("amount_too_large"));
    }
    Ok(())
}

/// Validates a coupon code after trimming and upper-casing
pub fn validate_coupon_code(code: &str) -> Result<(), ValidationError> {
    if coupon_code_regex().is_match(&code.trim().to_uppercase()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_coupon_code"))
    }
}

/// Validates an idempotency key: printable ASCII without whitespace
pub fn validate_idempotency_key(key: &str) -> Result<(), ValidationError> {
    if !key.is_empty() && key.chars().all(|c| c.is_ascii_graphic()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_idempotency_key"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_positive_amount() {
        assert!(validate_positive_amount(&dec!(10.50)).is_ok());
        assert!(validate_positive_amount(&dec!(10.500)).is_ok());
        assert!(validate_positive_amount(&dec!(0)).is_err());
        assert!(validate_positive_amount(&dec!(-1)).is_err());
        assert!(validate_positive_amount(&dec!(1.005)).is_err());
        assert!(validate_positive_amount(&dec!(100000.01)).is_err());
    }

    #[test]
    fn test_coupon_code() {
        assert!(validate_coupon_code("SAVE10").is_ok());
        assert!(validate_coupon_code(" save10 ").is_ok());
        assert!(validate_coupon_code("NEW_USER-50").is_ok());
        assert!(validate_coupon_code("AB").is_err());
        assert!(validate_coupon_code("SAVE 10").is_err());
        assert!(validate_coupon_code("").is_err());
    }

    #[test]
    fn test_idempotency_key() {
        assert!(validate_idempotency_key("checkout-7f3a").is_ok());
        assert!(validate_idempotency_key("has space").is_err());
        assert!(validate_idempotency_key("").is_err());
    }
}
