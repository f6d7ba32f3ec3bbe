use crate::error::ApiError;

/// Error types for cart operations
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    #[error("Menu item {0} not found")]
    ItemNotFound(i32),

    #[error("{0} is currently unavailable")]
    ItemUnavailable(String),

    #[error("Variant {variant_id} is not offered for menu item {menu_item_id}")]
    InvalidVariant { menu_item_id: i32, variant_id: i32 },

    #[error("Add-on {add_on_id} is not offered for menu item {menu_item_id}")]
    InvalidAddOn { menu_item_id: i32, add_on_id: i32 },

    #[error("Cart already holds items from restaurant {current}; clear it before ordering from restaurant {requested}")]
    CrossRestaurant { current: i32, requested: i32 },

    #[error("Cart item {0} not found")]
    LineNotFound(i32),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        let message = err.to_string();
        match err {
            CartError::ItemNotFound(id) => ApiError::not_found("MenuItem", id),
            CartError::ItemUnavailable(_) => ApiError::rule("ITEMS_UNAVAILABLE", message),
            CartError::InvalidVariant { .. } => ApiError::rule("INVALID_VARIANT", message),
            CartError::InvalidAddOn { .. } => ApiError::rule("INVALID_ADD_ON", message),
            CartError::CrossRestaurant { .. } => ApiError::conflict("CROSS_RESTAURANT_CART", message),
            CartError::LineNotFound(id) => ApiError::not_found("CartItem", id),
            CartError::Database(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_cross_restaurant_is_conflict() {
        let error: ApiError = CartError::CrossRestaurant { current: 1, requested: 2 }.into();
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
        assert_eq!(error.error_code(), "CROSS_RESTAURANT_CART");
    }

    #[test]
    fn test_missing_line_is_not_found() {
        let error: ApiError = CartError::LineNotFound(4).into();
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }
}
