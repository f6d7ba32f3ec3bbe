// HTTP handlers for coupon endpoints

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::auth::{AuthenticatedUser, Role};
use crate::coupons::{Coupon, CouponPreview, CreateCouponRequest, ValidateCouponRequest};
use crate::error::ApiError;
use crate::AppState;

/// Handler for POST /api/coupons/validate
/// Previews the discount against the caller's current cart
pub async fn validate_coupon_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<ValidateCouponRequest>,
) -> Result<Json<CouponPreview>, ApiError> {
    user.require_role(&[Role::Customer])?;
    request.validate()?;

    let preview = state
        .coupon_service
        .preview(user.user_id, &request.code)
        .await?;
    Ok(Json(preview))
}

/// Handler for POST /api/admin/coupons
pub async fn create_coupon_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateCouponRequest>,
) -> Result<(StatusCode, Json<Coupon>), ApiError> {
    user.require_role(&[Role::Admin])?;
    request.validate()?;

    let coupon = state.coupon_service.create(request).await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

/// Handler for GET /api/admin/coupons
pub async fn list_coupons_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Coupon>>, ApiError> {
    user.require_role(&[Role::Admin])?;
    let coupons = state.coupon_service.list().await?;
    Ok(Json(coupons))
}
