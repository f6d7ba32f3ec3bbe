// HTTP handlers for wallet endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::auth::{AuthenticatedUser, Role};
use crate::error::ApiError;
use crate::wallet::{
    CreditWalletRequest, ReconciliationReport, TransactionsQuery, WalletSummary, WalletTransaction,
};
use crate::AppState;

/// Handler for GET /api/wallet
#[utoipa::path(
    get,
    path = "/api/wallet",
    responses((status = 200, description = "Balance and recent entries", body = WalletSummary)),
    tag = "wallet"
)]
pub async fn get_wallet_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<WalletSummary>, ApiError> {
    let summary = state.wallet_service.summary(user.user_id).await?;
    Ok(Json(summary))
}

/// Handler for GET /api/wallet/transactions
#[utoipa::path(
    get,
    path = "/api/wallet/transactions",
    params(("limit" = Option<i64>, Query, description = "Max entries, newest first (1-100)")),
    responses((status = 200, description = "Ledger entries", body = Vec<WalletTransaction>)),
    tag = "wallet"
)]
pub async fn list_wallet_transactions_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<TransactionsQuery>,
) -> Result<Json<Vec<WalletTransaction>>, ApiError> {
    let entries = state
        .wallet_service
        .transactions(user.user_id, query.limit)
        .await?;
    Ok(Json(entries))
}

/// Handler for POST /api/admin/wallets/{user_id}/credit
#[utoipa::path(
    post,
    path = "/api/admin/wallets/{user_id}/credit",
    params(("user_id" = i32, Path, description = "Wallet owner")),
    request_body = CreditWalletRequest,
    responses(
        (status = 201, description = "Credit recorded", body = WalletTransaction),
        (status = 403, description = "Admin only")
    ),
    tag = "wallet"
)]
pub async fn admin_credit_wallet_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<i32>,
    Json(request): Json<CreditWalletRequest>,
) -> Result<(StatusCode, Json<WalletTransaction>), ApiError> {
    user.require_role(&[Role::Admin])?;
    request.validate()?;

    tracing::info!("Admin {} crediting wallet of user {}", user.user_id, user_id);
    let entry = state
        .wallet_service
        .credit(user_id, request.amount, &request.description, request.reference_id)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Handler for GET /api/admin/wallets/{user_id}/reconcile
#[utoipa::path(
    get,
    path = "/api/admin/wallets/{user_id}/reconcile",
    params(("user_id" = i32, Path, description = "Wallet owner")),
    responses(
        (status = 200, description = "Ledger replay result", body = ReconciliationReport),
        (status = 403, description = "Admin only")
    ),
    tag = "wallet"
)]
pub async fn admin_reconcile_wallet_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<i32>,
) -> Result<Json<ReconciliationReport>, ApiError> {
    user.require_role(&[Role::Admin])?;
    let report = state.wallet_service.reconcile(user_id).await?;
    Ok(Json(report))
}
