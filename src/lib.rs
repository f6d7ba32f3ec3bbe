// Takeaway ordering settlement backend
// Carts, checkout, wallet ledger, coupons and the order lifecycle over PostgreSQL

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod coupons;
pub mod db;
pub mod error;
pub mod money;
pub mod notifications;
pub mod orders;
pub mod outbox;
pub mod pricing;
pub mod validation;
pub mod wallet;

use axum::{
    extract::FromRef,
    response::Json,
    routing::{get, patch, post},
    Router,
};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use auth::TokenService;
use cart::CartService;
use coupons::CouponService;
use orders::OrderService;
use outbox::OutboxHandle;
use wallet::WalletService;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        cart::handlers::get_cart_handler,
        cart::handlers::add_to_cart_handler,
        cart::handlers::update_cart_item_handler,
        cart::handlers::remove_cart_item_handler,
        cart::handlers::clear_cart_handler,
        orders::handlers::create_order_handler,
        orders::handlers::list_orders_handler,
        orders::handlers::get_order_handler,
        orders::handlers::cancel_order_handler,
        orders::handlers::reorder_handler,
        orders::handlers::update_order_status_handler,
        orders::handlers::confirm_payment_handler,
        orders::handlers::list_restaurant_orders_handler,
        wallet::handlers::get_wallet_handler,
        wallet::handlers::list_wallet_transactions_handler,
        wallet::handlers::admin_credit_wallet_handler,
        wallet::handlers::admin_reconcile_wallet_handler,
    ),
    components(
        schemas(
            HealthResponse,
            pricing::AddOnSnapshot,
            pricing::PricedLine,
            pricing::UnavailableLine,
            pricing::UnavailableReason,
            cart::CartView,
            cart::AddToCartRequest,
            cart::UpdateCartItemRequest,
            orders::Order,
            orders::OrderLine,
            orders::OrderResponse,
            orders::OrderStatus,
            orders::PaymentStatus,
            orders::CreateOrderRequest,
            orders::UpdateStatusRequest,
            orders::ConfirmPaymentRequest,
            orders::ReorderSummary,
            orders::ReorderedLine,
            orders::SkippedLine,
            wallet::WalletSummary,
            wallet::WalletTransaction,
            wallet::CreditWalletRequest,
            wallet::ReconciliationReport,
            coupons::Coupon,
            coupons::CouponPreview,
            coupons::ValidateCouponRequest,
            coupons::CreateCouponRequest,
        )
    ),
    tags(
        (name = "health", description = "Liveness"),
        (name = "cart", description = "Customer cart"),
        (name = "orders", description = "Checkout and order lifecycle"),
        (name = "wallet", description = "Prepaid wallet and ledger")
    ),
    info(
        title = "Takeaway API",
        version = "1.0.0",
        description = "Checkout, wallet and order lifecycle for takeaway restaurants"
    )
)]
pub struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub tokens: TokenService,
    pub outbox: OutboxHandle,
    pub cart_service: CartService,
    pub order_service: OrderService,
    pub wallet_service: WalletService,
    pub coupon_service: CouponService,
}

impl AppState {
    pub fn new(db: PgPool, tokens: TokenService, outbox: OutboxHandle) -> Self {
        Self {
            cart_service: CartService::new(db.clone()),
            order_service: OrderService::new(db.clone(), outbox.clone()),
            wallet_service: WalletService::new(db.clone()),
            coupon_service: CouponService::new(db.clone()),
            db,
            tokens,
            outbox,
        }
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Handler for GET /health
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "health"
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS and request tracing
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health))
        // Cart
        .route(
            "/api/cart",
            get(cart::handlers::get_cart_handler).delete(cart::handlers::clear_cart_handler),
        )
        .route("/api/cart/items", post(cart::handlers::add_to_cart_handler))
        .route(
            "/api/cart/items/:item_id",
            patch(cart::handlers::update_cart_item_handler)
                .delete(cart::handlers::remove_cart_item_handler),
        )
        // Orders
        .route(
            "/api/orders",
            post(orders::handlers::create_order_handler).get(orders::handlers::list_orders_handler),
        )
        .route("/api/orders/:order_id", get(orders::handlers::get_order_handler))
        .route(
            "/api/orders/:order_id/cancel",
            post(orders::handlers::cancel_order_handler),
        )
        .route(
            "/api/orders/:order_id/reorder",
            post(orders::handlers::reorder_handler),
        )
        .route(
            "/api/orders/:order_id/status",
            patch(orders::handlers::update_order_status_handler),
        )
        .route(
            "/api/orders/:order_id/payment",
            post(orders::handlers::confirm_payment_handler),
        )
        .route(
            "/api/restaurants/:restaurant_id/orders",
            get(orders::handlers::list_restaurant_orders_handler),
        )
        // Wallet
        .route("/api/wallet", get(wallet::handlers::get_wallet_handler))
        .route(
            "/api/wallet/transactions",
            get(wallet::handlers::list_wallet_transactions_handler),
        )
        .route(
            "/api/admin/wallets/:user_id/credit",
            post(wallet::handlers::admin_credit_wallet_handler),
        )
        .route(
            "/api/admin/wallets/:user_id/reconcile",
            get(wallet::handlers::admin_reconcile_wallet_handler),
        )
        // Coupons
        .route(
            "/api/coupons/validate",
            post(coupons::handlers::validate_coupon_handler),
        )
        .route(
            "/api/admin/coupons",
            post(coupons::handlers::create_coupon_handler)
                .get(coupons::handlers::list_coupons_handler),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
