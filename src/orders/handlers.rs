// HTTP handlers for order endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{AuthenticatedUser, Role};
use crate::error::ApiError;
use crate::orders::{
    ConfirmPaymentRequest, CreateOrderRequest, OrderListQuery, OrderResponse, ReorderSummary,
    UpdateStatusRequest,
};
use crate::AppState;

/// Handler for POST /api/orders
/// Checks out the caller's cart; a retried idempotency key returns the original order
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order placed", body = OrderResponse),
        (status = 200, description = "Order already placed with this idempotency key", body = OrderResponse),
        (status = 400, description = "Empty cart, unavailable items, minimum order or coupon rejected"),
        (status = 401, description = "Missing or invalid token"),
        (status = 503, description = "Transient failure, retry with the same idempotency key")
    ),
    tag = "orders"
)]
pub async fn create_order_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    user.require_role(&[Role::Customer])?;
    request.validate()?;

    let outcome = state
        .order_service
        .create_order(user.user_id, request)
        .await?;

    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome.order)))
}

/// Handler for GET /api/orders
/// Order history for the caller, optionally filtered by status
#[utoipa::path(
    get,
    path = "/api/orders",
    params(("status" = Option<String>, Query, description = "Only orders in this status")),
    responses(
        (status = 200, description = "Order history", body = Vec<OrderResponse>),
        (status = 401, description = "Missing or invalid token")
    ),
    tag = "orders"
)]
pub async fn list_orders_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    user.require_role(&[Role::Customer])?;
    let orders = state
        .order_service
        .list_user_orders(user.user_id, query.status)
        .await?;
    Ok(Json(orders))
}

/// Handler for GET /api/orders/{order_id}
#[utoipa::path(
    get,
    path = "/api/orders/{order_id}",
    params(("order_id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order detail", body = OrderResponse),
        (status = 403, description = "Not the customer, restaurant owner or an admin"),
        (status = 404, description = "Order not found")
    ),
    tag = "orders"
)]
pub async fn get_order_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.order_service.get_order(order_id, &user).await?;
    Ok(Json(order))
}

/// Handler for POST /api/orders/{order_id}/cancel
#[utoipa::path(
    post,
    path = "/api/orders/{order_id}/cancel",
    params(("order_id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order cancelled and wallet refunded", body = OrderResponse),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order already confirmed by the restaurant")
    ),
    tag = "orders"
)]
pub async fn cancel_order_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    user.require_role(&[Role::Customer])?;
    let order = state
        .order_service
        .cancel_order(order_id, user.user_id)
        .await?;
    Ok(Json(order))
}

/// Handler for POST /api/orders/{order_id}/reorder
/// Copies the order's lines back into the cart at current prices
#[utoipa::path(
    post,
    path = "/api/orders/{order_id}/reorder",
    params(("order_id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Lines added and skipped", body = ReorderSummary),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Cart holds items from another restaurant")
    ),
    tag = "orders"
)]
pub async fn reorder_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<ReorderSummary>, ApiError> {
    user.require_role(&[Role::Customer])?;
    let summary = state
        .order_service
        .reorder_from_past_order(order_id, user.user_id)
        .await?;
    Ok(Json(summary))
}

/// Handler for PATCH /api/orders/{order_id}/status
/// Fulfillment transition by the restaurant owner or an admin
#[utoipa::path(
    patch,
    path = "/api/orders/{order_id}/status",
    params(("order_id" = Uuid, Path, description = "Order id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = OrderResponse),
        (status = 400, description = "Preparation time outside confirmation"),
        (status = 403, description = "Caller does not manage this restaurant"),
        (status = 409, description = "Transition not allowed from the current status")
    ),
    tag = "orders"
)]
pub async fn update_order_status_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    user.require_role(&[Role::Owner, Role::Admin])?;
    request.validate()?;

    let order = state
        .order_service
        .update_status(&user, order_id, request)
        .await?;
    Ok(Json(order))
}

/// Handler for POST /api/orders/{order_id}/payment
/// Records a gateway-confirmed payment
#[utoipa::path(
    post,
    path = "/api/orders/{order_id}/payment",
    params(("order_id" = Uuid, Path, description = "Order id")),
    request_body = ConfirmPaymentRequest,
    responses(
        (status = 200, description = "Order marked paid", body = OrderResponse),
        (status = 409, description = "Order is not pending")
    ),
    tag = "orders"
)]
pub async fn confirm_payment_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<ConfirmPaymentRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    user.require_role(&[Role::Admin])?;
    request.validate()?;

    let order = state
        .order_service
        .confirm_payment(order_id, request)
        .await?;
    Ok(Json(order))
}

/// Handler for GET /api/restaurants/{restaurant_id}/orders
#[utoipa::path(
    get,
    path = "/api/restaurants/{restaurant_id}/orders",
    params(
        ("restaurant_id" = i32, Path, description = "Restaurant id"),
        ("status" = Option<String>, Query, description = "Only orders in this status")
    ),
    responses(
        (status = 200, description = "Restaurant order queue", body = Vec<OrderResponse>),
        (status = 403, description = "Caller does not manage this restaurant")
    ),
    tag = "orders"
)]
pub async fn list_restaurant_orders_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(restaurant_id): Path<i32>,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    user.require_role(&[Role::Owner, Role::Admin])?;
    let orders = state
        .order_service
        .list_restaurant_orders(&user, restaurant_id, query.status)
        .await?;
    Ok(Json(orders))
}
