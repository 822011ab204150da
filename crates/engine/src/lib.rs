//! Storage core of walletbook: categories, wallets and transactions on SQLite.
//!
//! Every transaction write keeps wallet balances in step with the ledger
//! inside a single database transaction. See [`Engine`] for the entry point.

pub use categories::{Category, CategoryKind};
pub use error::{EngineError, Violations};
pub use money::MoneyCents;
pub use ops::{
    AppliedMigration, CategoryTotal, DatabaseStatus, Engine, EngineBuilder, TableCounts,
    TransactionDetails, TransactionFilter, WalletTotal,
};
pub use transactions::{BalanceEffect, Transaction, TransactionKind};
pub use util::new_id;
pub use wallets::{Wallet, WalletKind};

mod categories;
mod error;
mod money;
mod ops;
mod seed;
mod transactions;
mod util;
pub mod validation;
mod wallets;

pub type ResultEngine<T> = Result<T, EngineError>;
