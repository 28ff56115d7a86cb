//! Durable key-value storage. Provides:
//! - The [`KeyValueStore`] trait both stores persist through
//! - An in-memory backend ([`MemoryStore`]) and a directory-of-files backend ([`FileStore`])
//! - Typed JSON helpers ([`read_json`], [`write_json`]) and the key layout
//!
//! Writes are synchronous: once a call returns `Ok`, the value is stored.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{Error, Result};

pub const REGISTERED_USERS_KEY: &str = "registered_users";
pub const AUTH_SESSION_KEY: &str = "auth_session";

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// The four per-account collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Transactions,
    Goals,
    Categories,
    UserConfig,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Transactions,
        Collection::Goals,
        Collection::Categories,
        Collection::UserConfig,
    ];

    fn suffix(self) -> &'static str {
        match self {
            Collection::Transactions => "transactions",
            Collection::Goals => "goals",
            Collection::Categories => "categories",
            Collection::UserConfig => "userConfig",
        }
    }

    /// Storage key of this collection for one account, e.g. `{uid}_goals`.
    pub fn key(self, account_id: &str) -> String {
        format!("{}_{}", account_id, self.suffix())
    }
}

/// Reads and decodes a JSON value. Missing keys are `None`; unreadable JSON
/// is a hard [`Error::StorageParseFailure`].
pub fn read_json<T, S>(store: &S, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match store.get(key)? {
        None => Ok(None),
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| Error::StorageParseFailure {
                key: key.to_string(),
                source,
            }),
    }
}

/// Encodes a value as JSON and writes it under `key`, replacing what was there.
pub fn write_json<T, S>(store: &S, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(value).map_err(|source| Error::StorageEncode {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_keys() {
        assert_eq!(Collection::Transactions.key("u1"), "u1_transactions");
        assert_eq!(Collection::Goals.key("u1"), "u1_goals");
        assert_eq!(Collection::Categories.key("u1"), "u1_categories");
        assert_eq!(Collection::UserConfig.key("u1"), "u1_userConfig");
    }

    #[test]
    fn test_json_helpers() -> Result<()> {
        let store = MemoryStore::new();
        assert_eq!(read_json::<Vec<u32>, _>(&store, "k")?, None);

        write_json(&store, "k", &vec![1u32, 2, 3])?;
        assert_eq!(read_json::<Vec<u32>, _>(&store, "k")?, Some(vec![1, 2, 3]));
        Ok(())
    }

    #[test]
    fn test_corrupt_json_is_parse_failure() -> Result<()> {
        let store = MemoryStore::new();
        store.set("k", "[1, 2")?;
        assert!(matches!(
            read_json::<Vec<u32>, _>(&store, "k"),
            Err(Error::StorageParseFailure { key, .. }) if key == "k"
        ));
        Ok(())
    }
}
