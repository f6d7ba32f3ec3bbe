// HTTP handlers for cart endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::auth::{AuthenticatedUser, Role};
use crate::cart::{AddToCartRequest, CartView, UpdateCartItemRequest};
use crate::error::ApiError;
use crate::AppState;

/// Handler for GET /api/cart
#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Priced cart", body = CartView),
        (status = 401, description = "Missing or invalid token")
    ),
    tag = "cart"
)]
pub async fn get_cart_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<CartView>, ApiError> {
    user.require_role(&[Role::Customer])?;
    let view = state.cart_service.get_cart(user.user_id).await?;
    Ok(Json(view))
}

/// Handler for POST /api/cart/items
/// Adds an item, merging with an identical line if one exists
#[utoipa::path(
    post,
    path = "/api/cart/items",
    request_body = AddToCartRequest,
    responses(
        (status = 201, description = "Item added", body = CartView),
        (status = 400, description = "Invalid or unavailable item"),
        (status = 409, description = "Cart holds items from another restaurant")
    ),
    tag = "cart"
)]
pub async fn add_to_cart_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<AddToCartRequest>,
) -> Result<(StatusCode, Json<CartView>), ApiError> {
    user.require_role(&[Role::Customer])?;
    request.validate()?;

    let view = state.cart_service.add_to_cart(user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Handler for PATCH /api/cart/items/{item_id}
#[utoipa::path(
    patch,
    path = "/api/cart/items/{item_id}",
    params(("item_id" = i32, Path, description = "Cart line id")),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Quantity updated", body = CartView),
        (status = 404, description = "Line not in the caller's cart")
    ),
    tag = "cart"
)]
pub async fn update_cart_item_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(item_id): Path<i32>,
    Json(request): Json<UpdateCartItemRequest>,
) -> Result<Json<CartView>, ApiError> {
    user.require_role(&[Role::Customer])?;
    request.validate()?;

    let view = state
        .cart_service
        .update_quantity(user.user_id, item_id, request.quantity)
        .await?;
    Ok(Json(view))
}

/// Handler for DELETE /api/cart/items/{item_id}
#[utoipa::path(
    delete,
    path = "/api/cart/items/{item_id}",
    params(("item_id" = i32, Path, description = "Cart line id")),
    responses(
        (status = 200, description = "Line removed", body = CartView),
        (status = 404, description = "Line not in the caller's cart")
    ),
    tag = "cart"
)]
pub async fn remove_cart_item_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(item_id): Path<i32>,
) -> Result<Json<CartView>, ApiError> {
    user.require_role(&[Role::Customer])?;
    let view = state.cart_service.remove_line(user.user_id, item_id).await?;
    Ok(Json(view))
}

/// Handler for DELETE /api/cart
#[utoipa::path(
    delete,
    path = "/api/cart",
    responses((status = 204, description = "Cart cleared")),
    tag = "cart"
)]
pub async fn clear_cart_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<StatusCode, ApiError> {
    user.require_role(&[Role::Customer])?;
    state.cart_service.clear_cart(user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
