use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::money::round2;
use crate::wallet::{ReconciliationReport, TransactionType, Wallet, WalletError, WalletTransaction};

/// Transaction-scoped wallet operations
///
/// Each function runs on the caller's connection, so the caller decides the
/// atomic unit: a standalone top-up, or the order transaction that also
/// inserts the order row.
pub struct WalletLedger;

impl WalletLedger {
    /// Return the user's wallet, creating a zero-balance row on first use
    pub async fn get_or_create_wallet(
        conn: &mut PgConnection,
        user_id: i32,
    ) -> Result<Wallet, WalletError> {
        Self::ensure_row(conn, user_id).await?;
        let wallet = sqlx::query_as::<_, Wallet>(
            "SELECT user_id, balance, updated_at FROM wallets WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(wallet)
    }

    /// Take the exclusive row lock on the user's wallet for the rest of the transaction
    ///
    /// Any balance read through the returned value is stable until commit.
    pub async fn lock_wallet(conn: &mut PgConnection, user_id: i32) -> Result<Wallet, WalletError> {
        Self::ensure_row(conn, user_id).await?;
        let wallet = sqlx::query_as::<_, Wallet>(
            "SELECT user_id, balance, updated_at FROM wallets WHERE user_id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
        Ok(wallet)
    }

    /// Add `amount` to the balance and append a credit entry
    #[tracing::instrument(skip(conn, description))]
    pub async fn credit(
        conn: &mut PgConnection,
        user_id: i32,
        amount: Decimal,
        description: &str,
        reference_id: Option<Uuid>,
    ) -> Result<WalletTransaction, WalletError> {
        Self::mutate(conn, user_id, TransactionType::Credit, amount, description, reference_id).await
    }

    /// Subtract `amount` from the balance and append a debit entry
    ///
    /// The balance check happens against the locked row.
    #[tracing::instrument(skip(conn, description))]
    pub async fn debit(
        conn: &mut PgConnection,
        user_id: i32,
        amount: Decimal,
        description: &str,
        reference_id: Option<Uuid>,
    ) -> Result<WalletTransaction, WalletError> {
        Self::mutate(conn, user_id, TransactionType::Debit, amount, description, reference_id).await
    }

    async fn mutate(
        conn: &mut PgConnection,
        user_id: i32,
        transaction_type: TransactionType,
        amount: Decimal,
        description: &str,
        reference_id: Option<Uuid>,
    ) -> Result<WalletTransaction, WalletError> {
        let amount = round2(amount);
        let wallet = Self::lock_wallet(conn, user_id).await?;
        let balance_after = apply(wallet.balance, transaction_type, amount)?;

        sqlx::query("UPDATE wallets SET balance = $2, updated_at = NOW() WHERE user_id = $1")
            .bind(user_id)
            .bind(balance_after)
            .execute(&mut *conn)
            .await?;

        let entry = sqlx::query_as::<_, WalletTransaction>(
            r#"
            INSERT INTO wallet_transactions (user_id, type, amount, description, reference_id, balance_after)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, type, amount, description, reference_id, balance_after, created_at
            "#,
        )
        .bind(user_id)
        .bind(transaction_type)
        .bind(amount)
        .bind(description)
        .bind(reference_id)
        .bind(balance_after)
        .fetch_one(&mut *conn)
        .await?;

        tracing::debug!(
            "Wallet {} {} of {} for user {}, balance now {}",
            transaction_type,
            entry.id,
            amount,
            user_id,
            balance_after
        );
        Ok(entry)
    }

    /// Ledger rows for a user in creation order
    pub async fn history(
        conn: &mut PgConnection,
        user_id: i32,
    ) -> Result<Vec<WalletTransaction>, WalletError> {
        let rows = sqlx::query_as::<_, WalletTransaction>(
            r#"
            SELECT id, user_id, type, amount, description, reference_id, balance_after, created_at
            FROM wallet_transactions
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    /// Most recent ledger rows first
    pub async fn recent(
        conn: &mut PgConnection,
        user_id: i32,
        limit: i64,
    ) -> Result<Vec<WalletTransaction>, WalletError> {
        let rows = sqlx::query_as::<_, WalletTransaction>(
            r#"
            SELECT id, user_id, type, amount, description, reference_id, balance_after, created_at
            FROM wallet_transactions
            WHERE user_id = $1
            ORDER BY id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows)
    }

    async fn ensure_row(conn: &mut PgConnection, user_id: i32) -> Result<(), WalletError> {
        sqlx::query("INSERT INTO wallets (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

/// Balance after applying one entry; debits may not overdraw
pub fn apply(
    balance: Decimal,
    transaction_type: TransactionType,
    amount: Decimal,
) -> Result<Decimal, WalletError> {
    if amount <= Decimal::ZERO {
        return Err(WalletError::InvalidAmount(amount));
    }
    if transaction_type == TransactionType::Debit && balance < amount {
        return Err(WalletError::InsufficientBalance {
            available: balance,
            requested: amount,
        });
    }
    Ok(round2(balance + transaction_type.signed(amount)))
}

/// Replay ledger rows (in creation order) and compare with the stored balance
pub fn replay(
    user_id: i32,
    stored_balance: Decimal,
    entries: &[WalletTransaction],
) -> ReconciliationReport {
    let mut running = Decimal::ZERO;
    let mut first_mismatch_id = None;

    for entry in entries {
        running = round2(running + entry.transaction_type.signed(entry.amount));
        if first_mismatch_id.is_none() && running != entry.balance_after {
            first_mismatch_id = Some(entry.id);
        }
    }

    ReconciliationReport {
        user_id,
        stored_balance,
        replayed_balance: running,
        transaction_count: entries.len(),
        first_mismatch_id,
        consistent: first_mismatch_id.is_none() && running == stored_balance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn entry(id: i64, transaction_type: TransactionType, amount: Decimal, balance_after: Decimal) -> WalletTransaction {
        WalletTransaction {
            id,
            user_id: 1,
            transaction_type,
            amount,
            description: "test".to_string(),
            reference_id: None,
            balance_after,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_apply_credit_and_debit() {
        assert_eq!(apply(dec!(10.00), TransactionType::Credit, dec!(5.25)).unwrap(), dec!(15.25));
        assert_eq!(apply(dec!(10.00), TransactionType::Debit, dec!(10.00)).unwrap(), dec!(0.00));
    }

    #[test]
    fn test_apply_rejects_overdraw() {
        let result = apply(dec!(10.00), TransactionType::Debit, dec!(10.01));
        match result {
            Err(WalletError::InsufficientBalance { available, requested }) => {
                assert_eq!(available, dec!(10.00));
                assert_eq!(requested, dec!(10.01));
            }
            other => panic!("expected insufficient balance, got {:?}", other),
        }
    }

    #[test]
    fn test_apply_rejects_non_positive_amount() {
        assert!(matches!(
            apply(dec!(10), TransactionType::Credit, Decimal::ZERO),
            Err(WalletError::InvalidAmount(_))
        ));
        assert!(matches!(
            apply(dec!(10), TransactionType::Debit, dec!(-1)),
            Err(WalletError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_replay_consistent_ledger() {
        let entries = vec![
            entry(1, TransactionType::Credit, dec!(1000.00), dec!(1000.00)),
            entry(2, TransactionType::Debit, dec!(450.00), dec!(550.00)),
            entry(3, TransactionType::Credit, dec!(450.00), dec!(1000.00)),
        ];
        let report = replay(1, dec!(1000.00), &entries);
        assert!(report.consistent);
        assert_eq!(report.transaction_count, 3);
        assert_eq!(report.first_mismatch_id, None);
    }

    #[test]
    fn test_replay_detects_drift() {
        let entries = vec![
            entry(1, TransactionType::Credit, dec!(100.00), dec!(100.00)),
            entry(2, TransactionType::Debit, dec!(40.00), dec!(70.00)),
        ];
        let report = replay(1, dec!(60.00), &entries);
        assert!(!report.consistent);
        assert_eq!(report.first_mismatch_id, Some(2));
        assert_eq!(report.replayed_balance, dec!(60.00));
    }

    #[test]
    fn test_replay_detects_stored_balance_without_entry() {
        let entries = vec![entry(1, TransactionType::Credit, dec!(100.00), dec!(100.00))];
        let report = replay(1, dec!(50.00), &entries);
        assert!(!report.consistent);
        assert_eq!(report.first_mismatch_id, None);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    /// Applying any sequence of credits and debits (skipping rejected overdraws)
    /// never goes negative, and replaying the accepted entries reproduces the balance.
    #[test]
    fn prop_ledger_replay_matches_running_balance() {
        proptest!(|(ops in prop::collection::vec((any::<bool>(), 1u32..=50_000u32), 0..=40))| {
            let mut balance = Decimal::ZERO;
            let mut entries = Vec::new();

            for (i, (is_credit, cents)) in ops.into_iter().enumerate() {
                let transaction_type = if is_credit { TransactionType::Credit } else { TransactionType::Debit };
                let amount = Decimal::new(cents as i64, 2);
                match apply(balance, transaction_type, amount) {
                    Ok(next) => {
                        balance = next;
                        entries.push(WalletTransaction {
                            id: i as i64 + 1,
                            user_id: 1,
                            transaction_type,
                            amount,
                            description: String::new(),
                            reference_id: None,
                            balance_after: next,
                            created_at: Utc::now(),
                        });
                    }
                    Err(WalletError::InsufficientBalance { .. }) => {
                        prop_assert_eq!(transaction_type, TransactionType::Debit);
                    }
                    Err(other) => prop_assert!(false, "unexpected error: {}", other),
                }
                prop_assert!(balance >= Decimal::ZERO);
            }

            let report = replay(1, balance, &entries);
            prop_assert!(report.consistent);
            prop_assert_eq!(report.replayed_balance, balance);
        });
    }
}
