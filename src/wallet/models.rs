use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Wallet {
    pub user_id: i32,
    pub balance: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Credit,
    Debit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Credit => "credit",
            TransactionType::Debit => "debit",
        }
    }

    /// Signed effect of an entry of this type on the balance
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            TransactionType::Credit => amount,
            TransactionType::Debit => -amount,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Append-only ledger row
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct WalletTransaction {
    pub id: i64,
    pub user_id: i32,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub amount: Decimal,
    pub description: String,
    /// Order that caused the entry, if any
    pub reference_id: Option<Uuid>,
    pub balance_after: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WalletSummary {
    pub user_id: i32,
    pub balance: Decimal,
    pub recent_transactions: Vec<WalletTransaction>,
}

/// Request body for an admin credit (top-up or manual adjustment)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreditWalletRequest {
    #[validate(custom = "crate::validation::validate_positive_amount")]
    pub amount: Decimal,
    #[validate(length(min = 1, max = 255, message = "Description must be 1-255 characters"))]
    pub description: String,
    pub reference_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionsQuery {
    pub limit: Option<i64>,
}

/// Result of replaying a user's ledger against the stored balance
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReconciliationReport {
    pub user_id: i32,
    pub stored_balance: Decimal,
    pub replayed_balance: Decimal,
    pub transaction_count: usize,
    /// First ledger row whose `balance_after` disagrees with the running total
    pub first_mismatch_id: Option<i64>,
    pub consistent: bool,
}
