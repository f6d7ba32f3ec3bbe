use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::wallet::ledger::replay;
use crate::wallet::{
    ReconciliationReport, WalletError, WalletLedger, WalletSummary, WalletTransaction,
};

const RECENT_TRANSACTIONS: i64 = 10;
const MAX_PAGE: i64 = 100;

/// Standalone wallet operations, each in its own transaction
#[derive(Clone)]
pub struct WalletService {
    pool: PgPool,
}

impl WalletService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Balance plus the latest ledger entries
    pub async fn summary(&self, user_id: i32) -> Result<WalletSummary, WalletError> {
        let mut conn = self.pool.acquire().await?;
        let wallet = WalletLedger::get_or_create_wallet(&mut conn, user_id).await?;
        let recent_transactions = WalletLedger::recent(&mut conn, user_id, RECENT_TRANSACTIONS).await?;
        Ok(WalletSummary {
            user_id,
            balance: wallet.balance,
            recent_transactions,
        })
    }

    pub async fn transactions(
        &self,
        user_id: i32,
        limit: Option<i64>,
    ) -> Result<Vec<WalletTransaction>, WalletError> {
        let limit = limit.unwrap_or(50).clamp(1, MAX_PAGE);
        let mut conn = self.pool.acquire().await?;
        WalletLedger::recent(&mut conn, user_id, limit).await
    }

    #[tracing::instrument(skip(self, description))]
    pub async fn credit(
        &self,
        user_id: i32,
        amount: Decimal,
        description: &str,
        reference_id: Option<Uuid>,
    ) -> Result<WalletTransaction, WalletError> {
        let mut tx = self.pool.begin().await?;
        let entry = WalletLedger::credit(&mut tx, user_id, amount, description, reference_id).await?;
        tx.commit().await?;

        tracing::info!(
            "Credited {} to wallet of user {} (balance {})",
            entry.amount,
            user_id,
            entry.balance_after
        );
        Ok(entry)
    }

    /// Replay the ledger under the wallet lock and compare with the stored balance
    #[tracing::instrument(skip(self))]
    pub async fn reconcile(&self, user_id: i32) -> Result<ReconciliationReport, WalletError> {
        let mut tx = self.pool.begin().await?;
        let wallet = WalletLedger::lock_wallet(&mut tx, user_id).await?;
        let entries = WalletLedger::history(&mut tx, user_id).await?;
        tx.commit().await?;

        let report = replay(user_id, wallet.balance, &entries);
        if !report.consistent {
            tracing::error!(
                "Wallet ledger mismatch for user {}: stored {}, replayed {}, first bad entry {:?}",
                user_id,
                report.stored_balance,
                report.replayed_balance,
                report.first_mismatch_id
            );
        }
        Ok(report)
    }
}
