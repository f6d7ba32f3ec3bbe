// Wallet ledger
// Per-user prepaid balance with an append-only transaction log.
// Every mutation runs under a row lock on the wallet and writes one ledger row.

pub mod error;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod service;

pub use error::WalletError;
pub use ledger::WalletLedger;
pub use models::*;
pub use service::WalletService;
