use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::cart::service::price_cart;
use crate::cart::CartRepository;
use crate::coupons::{
    normalize_code, AppliedCoupon, Coupon, CouponError, CouponPreview, CouponRepository,
    CouponRules, CreateCouponRequest, DiscountType,
};
use crate::db::is_unique_violation;
use crate::money::round2;

const COUPON_CODE_CONSTRAINT: &str = "coupons_code_key";

/// Transaction-scoped coupon checks and redemption recording
pub struct CouponValidator;

impl CouponValidator {
    /// Validate `code` for a user and subtotal, returning the discount it grants
    ///
    /// The coupon row stays locked until the caller's transaction ends, so the
    /// usage caps hold across concurrent checkouts.
    pub async fn validate_coupon(
        conn: &mut PgConnection,
        code: &str,
        user_id: i32,
        subtotal: Decimal,
        now: DateTime<Utc>,
    ) -> Result<AppliedCoupon, CouponError> {
        let code = normalize_code(code)?;
        let coupon = CouponRepository::lock_by_code(conn, &code)
            .await?
            .ok_or_else(|| CouponError::NotFound(code.clone()))?;
        Self::apply(conn, coupon, user_id, subtotal, now).await
    }

    /// Same checks without taking the lock, for previews
    pub async fn check_coupon(
        conn: &mut PgConnection,
        code: &str,
        user_id: i32,
        subtotal: Decimal,
        now: DateTime<Utc>,
    ) -> Result<AppliedCoupon, CouponError> {
        let code = normalize_code(code)?;
        let coupon = CouponRepository::find_by_code(conn, &code)
            .await?
            .ok_or_else(|| CouponError::NotFound(code.clone()))?;
        Self::apply(conn, coupon, user_id, subtotal, now).await
    }

    async fn apply(
        conn: &mut PgConnection,
        coupon: Coupon,
        user_id: i32,
        subtotal: Decimal,
        now: DateTime<Utc>,
    ) -> Result<AppliedCoupon, CouponError> {
        let code = coupon.code.clone();
        let usage = CouponRepository::usage(conn, coupon.id, user_id).await?;

        let discount = CouponRules::evaluate(&coupon, now, subtotal, usage).map_err(|e| {
            tracing::debug!("Coupon {} rejected for user {}: {}", code, user_id, e);
            e
        })?;

        Ok(AppliedCoupon {
            coupon_id: coupon.id,
            code: coupon.code,
            discount,
        })
    }

    /// Record a redemption for a committed order; repeated calls are no-ops
    pub async fn record_coupon_usage(
        conn: &mut PgConnection,
        coupon_id: i32,
        user_id: i32,
        order_id: Uuid,
        discount: Decimal,
    ) -> Result<(), CouponError> {
        let recorded =
            CouponRepository::record_usage(conn, coupon_id, user_id, order_id, discount).await?;
        if recorded {
            tracing::info!(
                "Recorded redemption of coupon {} by user {} for order {}",
                coupon_id,
                user_id,
                order_id
            );
        } else {
            tracing::debug!(
                "Redemption of coupon {} for order {} already recorded",
                coupon_id,
                order_id
            );
        }
        Ok(())
    }
}

/// Customer preview and admin coupon management
#[derive(Clone)]
pub struct CouponService {
    pool: PgPool,
}

impl CouponService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Discount the caller's current cart would get with `code`
    #[tracing::instrument(skip(self))]
    pub async fn preview(&self, user_id: i32, code: &str) -> Result<CouponPreview, CouponError> {
        let mut conn = self.pool.acquire().await?;

        let subtotal = match CartRepository::find_by_user(&mut conn, user_id).await? {
            Some(cart) => {
                let items = CartRepository::list_items(&mut conn, cart.id).await?;
                price_cart(&mut conn, &cart, &items).await?.subtotal
            }
            None => Decimal::ZERO,
        };

        let applied =
            CouponValidator::check_coupon(&mut conn, code, user_id, subtotal, Utc::now()).await?;
        Ok(CouponPreview {
            code: applied.code,
            subtotal,
            discount: applied.discount,
            total_after_discount: round2(subtotal - applied.discount),
        })
    }

    #[tracing::instrument(skip(self, request), fields(code = %request.code))]
    pub async fn create(&self, request: CreateCouponRequest) -> Result<Coupon, CouponError> {
        let code = normalize_code(&request.code)?;
        if request.discount_type == DiscountType::Percentage
            && request.discount_value > Decimal::ONE_HUNDRED
        {
            return Err(CouponError::InvalidDefinition(
                "percentage discount cannot exceed 100".to_string(),
            ));
        }
        if request.min_order < Decimal::ZERO {
            return Err(CouponError::InvalidDefinition(
                "minimum order cannot be negative".to_string(),
            ));
        }

        let mut conn = self.pool.acquire().await?;
        let coupon = CouponRepository::insert(&mut conn, &code, &request)
            .await
            .map_err(|e| {
                if is_unique_violation(&e, COUPON_CODE_CONSTRAINT) {
                    CouponError::DuplicateCode(code.clone())
                } else {
                    CouponError::Database(e)
                }
            })?;

        tracing::info!("Created coupon {} ({})", coupon.code, coupon.discount_type);
        Ok(coupon)
    }

    pub async fn list(&self) -> Result<Vec<Coupon>, CouponError> {
        let mut conn = self.pool.acquire().await?;
        Ok(CouponRepository::list(&mut conn).await?)
    }
}
