//! Stateful stores for the ledger. Provides:
//! - Local accounts and the active session ([`AccountStore`])
//! - Per-account collections and backup restore ([`LedgerStore`])
//!
//! Both are synchronous and write through to a shared
//! [`KeyValueStore`](crate::storage::KeyValueStore) before returning.

mod accounts;
mod ledger;

pub use accounts::AccountStore;
pub use ledger::{LedgerEvent, LedgerStore};
