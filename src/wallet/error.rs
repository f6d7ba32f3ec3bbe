use rust_decimal::Decimal;

use crate::error::ApiError;

/// Error types for wallet operations
#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("Amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    #[error("Insufficient wallet balance: available {available}, requested {requested}")]
    InsufficientBalance { available: Decimal, requested: Decimal },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        let message = err.to_string();
        match err {
            WalletError::InvalidAmount(_) => ApiError::rule("INVALID_AMOUNT", message),
            WalletError::InsufficientBalance { .. } => {
                ApiError::rule("INSUFFICIENT_BALANCE", message)
            }
            WalletError::Database(e) => e.into(),
        }
    }
}
