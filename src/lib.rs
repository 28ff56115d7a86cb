pub mod backup;
pub mod config;
pub mod csv_utils;
mod dto;
mod error;
pub mod insights;
mod password;
pub mod runner;
pub mod storage;
pub mod stores;
pub mod summary;

pub use dto::{
    default_categories, Account, Category, CategoryPatch, FinancialGoal, Session, Transaction,
    TransactionType, UserConfig, UserProfile, DEFAULT_CURRENCY,
};
pub use error::{Error, Result};
pub use runner::App;
pub use stores::{AccountStore, LedgerEvent, LedgerStore};
