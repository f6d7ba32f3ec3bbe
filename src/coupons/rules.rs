use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::coupons::{Coupon, CouponError, CouponUsage, DiscountType};
use crate::money::round2;
use crate::validation::validate_coupon_code;

/// Trim and upper-case a customer-entered code, rejecting malformed ones
pub fn normalize_code(code: &str) -> Result<String, CouponError> {
    let normalized = code.trim().to_uppercase();
    validate_coupon_code(&normalized).map_err(|_| CouponError::InvalidCode(code.to_string()))?;
    Ok(normalized)
}

/// Discount for a subtotal, never more than the subtotal itself
pub fn compute_discount(
    discount_type: DiscountType,
    value: Decimal,
    max_discount: Option<Decimal>,
    subtotal: Decimal,
) -> Decimal {
    if subtotal <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let raw = match discount_type {
        DiscountType::Flat => value,
        DiscountType::Percentage => {
            let percent = round2(subtotal * value / Decimal::ONE_HUNDRED);
            match max_discount {
                Some(cap) => percent.min(cap),
                None => percent,
            }
        }
    };
    round2(raw.max(Decimal::ZERO).min(subtotal))
}

/// Eligibility rules, evaluated in a fixed order
pub struct CouponRules;

impl CouponRules {
    /// Check `coupon` for this subtotal and usage, returning the discount
    ///
    /// Order: active, not expired, global cap, minimum order, per-user cap.
    pub fn evaluate(
        coupon: &Coupon,
        now: DateTime<Utc>,
        subtotal: Decimal,
        usage: CouponUsage,
    ) -> Result<Decimal, CouponError> {
        if !coupon.is_active {
            return Err(CouponError::Inactive(coupon.code.clone()));
        }

        if let Some(expires_at) = coupon.expires_at {
            if expires_at <= now {
                return Err(CouponError::Expired {
                    code: coupon.code.clone(),
                    expired_at: expires_at,
                });
            }
        }

        if let Some(limit) = coupon.usage_limit {
            if i64::from(coupon.used_count) + usage.pending_total >= i64::from(limit) {
                return Err(CouponError::UsageLimitReached(coupon.code.clone()));
            }
        }

        if subtotal < coupon.min_order {
            return Err(CouponError::BelowMinimumOrder {
                code: coupon.code.clone(),
                min_order: coupon.min_order,
            });
        }

        if usage.user_redemptions + usage.pending_user >= i64::from(coupon.per_user_limit) {
            return Err(CouponError::PerUserLimitReached(coupon.code.clone()));
        }

        Ok(compute_discount(
            coupon.discount_type,
            coupon.discount_value,
            coupon.max_discount,
            subtotal,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn save10() -> Coupon {
        Coupon {
            id: 1,
            code: "SAVE10".to_string(),
            discount_type: DiscountType::Percentage,
            discount_value: dec!(10),
            max_discount: Some(dec!(50)),
            min_order: dec!(200),
            usage_limit: Some(100),
            used_count: 0,
            per_user_limit: 1,
            is_active: true,
            expires_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  save10 ").unwrap(), "SAVE10");
        assert!(matches!(normalize_code("x"), Err(CouponError::InvalidCode(_))));
    }

    #[test]
    fn test_percentage_capped_by_max_discount() {
        let discount = CouponRules::evaluate(&save10(), Utc::now(), dec!(500), CouponUsage::default()).unwrap();
        assert_eq!(discount, dec!(50.00));
    }

    #[test]
    fn test_percentage_below_cap() {
        let discount = CouponRules::evaluate(&save10(), Utc::now(), dec!(333.33), CouponUsage::default()).unwrap();
        assert_eq!(discount, dec!(33.33));
    }

    #[test]
    fn test_flat_discount_clamped_to_subtotal() {
        assert_eq!(compute_discount(DiscountType::Flat, dec!(150), None, dec!(120.50)), dec!(120.50));
        assert_eq!(compute_discount(DiscountType::Flat, dec!(40), None, dec!(120.50)), dec!(40.00));
    }

    #[test]
    fn test_inactive_checked_first() {
        let mut coupon = save10();
        coupon.is_active = false;
        coupon.expires_at = Some(Utc::now() - Duration::days(1));
        let result = CouponRules::evaluate(&coupon, Utc::now(), dec!(10), CouponUsage::default());
        assert!(matches!(result, Err(CouponError::Inactive(_))));
    }

    #[test]
    fn test_expired() {
        let mut coupon = save10();
        coupon.expires_at = Some(Utc::now() - Duration::minutes(1));
        let result = CouponRules::evaluate(&coupon, Utc::now(), dec!(500), CouponUsage::default());
        assert!(matches!(result, Err(CouponError::Expired { .. })));
    }

    #[test]
    fn test_global_cap_counts_queued_redemptions() {
        let mut coupon = save10();
        coupon.used_count = 99;
        let usage = CouponUsage { pending_total: 1, ..CouponUsage::default() };
        let result = CouponRules::evaluate(&coupon, Utc::now(), dec!(500), usage);
        assert!(matches!(result, Err(CouponError::UsageLimitReached(_))));
    }

    #[test]
    fn test_global_cap_checked_before_minimum_order() {
        let mut coupon = save10();
        coupon.used_count = 100;
        let result = CouponRules::evaluate(&coupon, Utc::now(), dec!(10), CouponUsage::default());
        assert!(matches!(result, Err(CouponError::UsageLimitReached(_))));
    }

    #[test]
    fn test_minimum_order() {
        let result = CouponRules::evaluate(&save10(), Utc::now(), dec!(199.99), CouponUsage::default());
        assert!(matches!(result, Err(CouponError::BelowMinimumOrder { .. })));
    }

    #[test]
    fn test_per_user_limit_uses_ledger_count() {
        let usage = CouponUsage { user_redemptions: 1, ..CouponUsage::default() };
        let result = CouponRules::evaluate(&save10(), Utc::now(), dec!(500), usage);
        assert!(matches!(result, Err(CouponError::PerUserLimitReached(_))));

        let usage = CouponUsage { pending_user: 1, ..CouponUsage::default() };
        let result = CouponRules::evaluate(&save10(), Utc::now(), dec!(500), usage);
        assert!(matches!(result, Err(CouponError::PerUserLimitReached(_))));
    }
}
