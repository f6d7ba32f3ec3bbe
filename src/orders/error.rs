use rust_decimal::Decimal;
use uuid::Uuid;

use crate::cart::CartError;
use crate::coupons::CouponError;
use crate::error::ApiError;
use crate::orders::status_machine::TransitionError;
use crate::orders::OrderStatus;
use crate::wallet::WalletError;

/// Error types for order operations
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Cart is empty")]
    CartEmpty,

    #[error("Restaurant {0} not found")]
    RestaurantNotFound(i32),

    #[error("{0} is not accepting orders right now")]
    RestaurantUnavailable(String),

    #[error("Some items in your cart are no longer available: {}", .0.join("; "))]
    ItemsUnavailable(Vec<String>),

    #[error("Minimum order is {min_order}, cart subtotal is {subtotal}")]
    BelowMinimumOrder { subtotal: Decimal, min_order: Decimal },

    #[error("Order {0} not found")]
    NotFound(Uuid),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Invalid status transition: {0}")]
    InvalidTransition(#[from] TransitionError),

    #[error("Order can no longer be cancelled (status: {0})")]
    NotCancellable(OrderStatus),

    #[error("Preparation time can only be set when confirming, not when moving to {0}")]
    PreparationTimeNotAllowed(OrderStatus),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Coupon(#[from] CouponError),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        let message = err.to_string();
        match err {
            OrderError::CartEmpty => ApiError::rule("CART_EMPTY", message),
            OrderError::RestaurantNotFound(id) => ApiError::not_found("Restaurant", id),
            OrderError::RestaurantUnavailable(_) => {
                ApiError::rule("RESTAURANT_UNAVAILABLE", message)
            }
            OrderError::ItemsUnavailable(_) => ApiError::rule("ITEMS_UNAVAILABLE", message),
            OrderError::BelowMinimumOrder { .. } => ApiError::rule("BELOW_MINIMUM_ORDER", message),
            OrderError::NotFound(id) => ApiError::not_found("Order", id),
            OrderError::Forbidden(reason) => ApiError::Forbidden(reason),
            OrderError::InvalidTransition(_) => ApiError::conflict("INVALID_TRANSITION", message),
            OrderError::NotCancellable(_) => ApiError::conflict("NOT_CANCELLABLE", message),
            OrderError::PreparationTimeNotAllowed(_) => {
                ApiError::rule("PREPARATION_TIME_NOT_ALLOWED", message)
            }
            OrderError::Cart(e) => e.into(),
            OrderError::Coupon(e) => e.into(),
            OrderError::Wallet(e) => e.into(),
            OrderError::Database(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::orders::StatusMachine;
    use axum::http::StatusCode;
    use rust_decimal_macros::dec;

    #[test]
    fn test_business_rule_codes() {
        let error: ApiError = OrderError::BelowMinimumOrder {
            subtotal: dec!(80),
            min_order: dec!(100),
        }
        .into();
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(error.error_code(), "BELOW_MINIMUM_ORDER");

        let error: ApiError = OrderError::CartEmpty.into();
        assert_eq!(error.error_code(), "CART_EMPTY");
    }

    #[test]
    fn test_transition_error_is_conflict_citing_allowed_set() {
        let transition =
            StatusMachine::transition(OrderStatus::Ready, OrderStatus::Confirmed, Role::Owner)
                .unwrap_err();
        let error = OrderError::from(transition);
        assert!(error.to_string().contains("from ready to confirmed"));

        let api: ApiError = error.into();
        assert_eq!(api.status_code(), StatusCode::CONFLICT);
        assert_eq!(api.error_code(), "INVALID_TRANSITION");
    }

    #[test]
    fn test_nested_errors_keep_their_codes() {
        let api: ApiError = OrderError::from(CartError::CrossRestaurant { current: 1, requested: 2 }).into();
        assert_eq!(api.error_code(), "CROSS_RESTAURANT_CART");

        let api: ApiError = OrderError::from(WalletError::InsufficientBalance {
            available: dec!(1),
            requested: dec!(2),
        })
        .into();
        assert_eq!(api.error_code(), "INSUFFICIENT_BALANCE");
    }

    #[test]
    fn test_transient_database_error_is_retryable() {
        let api: ApiError = OrderError::Database(sqlx::Error::PoolTimedOut).into();
        assert_eq!(api.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
