use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::password::{hash_password, verify_password};
use crate::storage::{
    read_json, write_json, KeyValueStore, AUTH_SESSION_KEY, REGISTERED_USERS_KEY,
};
use crate::{Account, Error, Result, Session};

/// Registry of local accounts plus the single active session.
///
/// The registry lives under `registered_users`; the active session under
/// `auth_session`. Both are written through before any call returns.
pub struct AccountStore<S> {
    storage: Arc<S>,
    session: Option<Session>,
}

impl<S: KeyValueStore> AccountStore<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            session: None,
        }
    }

    /// The signed-in account, if any.
    pub fn current(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// All registered accounts, as persisted.
    pub fn accounts(&self) -> Result<Vec<Account>> {
        Ok(read_json(&*self.storage, REGISTERED_USERS_KEY)?.unwrap_or_default())
    }

    /// Creates an account and signs it in.
    /// Emails are compared exactly; a registered email is rejected.
    ///
    /// The registry is written first. If the session cannot be saved
    /// afterwards, the registry is put back so no half-created account stays.
    pub fn register(&mut self, name: &str, email: &str, password: &str) -> Result<Session> {
        let previous = self.accounts()?;
        if previous.iter().any(|a| a.email == email) {
            return Err(Error::DuplicateEmail);
        }

        let account = Account {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: hash_password(password)?,
        };
        let session = Session::from(&account);
        let mut accounts = previous.clone();
        accounts.push(account);
        write_json(&*self.storage, REGISTERED_USERS_KEY, &accounts)?;

        match self.establish(session) {
            Ok(session) => {
                info!(account_id = %session.id, "registered account");
                Ok(session)
            }
            Err(e) => {
                let rollback = write_json(&*self.storage, REGISTERED_USERS_KEY, &previous);
                if let Err(rollback) = rollback {
                    warn!(error = %rollback, "could not roll back account registry");
                }
                Err(e)
            }
        }
    }

    /// Signs in with email and credential. Unknown email and wrong credential
    /// fail the same way.
    pub fn authenticate(&mut self, email: &str, password: &str) -> Result<Session> {
        let accounts = self.accounts()?;
        let Some(account) = accounts.iter().find(|a| a.email == email) else {
            return Err(Error::InvalidCredentials);
        };

        match verify_password(password, &account.password_hash) {
            Ok(true) => {}
            Ok(false) => return Err(Error::InvalidCredentials),
            Err(e) => {
                warn!(account_id = %account.id, error = %e, "stored credential is unusable");
                return Err(Error::InvalidCredentials);
            }
        }

        let session = Session::from(account);
        info!(account_id = %session.id, "signed in");
        self.establish(session)
    }

    /// Signs out. Calling it without a session is fine.
    pub fn end_session(&mut self) -> Result<()> {
        self.storage.remove(AUTH_SESSION_KEY)?;
        if let Some(session) = self.session.take() {
            info!(account_id = %session.id, "signed out");
        }
        Ok(())
    }

    /// Reinstates the persisted session, trusting local storage as-is.
    pub fn restore_session(&mut self) -> Result<Option<Session>> {
        self.session = read_json(&*self.storage, AUTH_SESSION_KEY)?;
        Ok(self.session.clone())
    }

    fn establish(&mut self, session: Session) -> Result<Session> {
        write_json(&*self.storage, AUTH_SESSION_KEY, &session)?;
        self.session = Some(session.clone());
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn new_store() -> (Arc<MemoryStore>, AccountStore<MemoryStore>) {
        let storage = Arc::new(MemoryStore::new());
        (storage.clone(), AccountStore::new(storage))
    }

    #[test]
    fn test_register_signs_in() -> Result<()> {
        let (_, mut store) = new_store();
        let session = store.register("Ana", "ana@x.com", "secret1")?;

        assert_eq!(session.name, "Ana");
        assert_eq!(store.current(), Some(&session));
        assert_eq!(store.accounts()?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_register_duplicate_email() -> Result<()> {
        let (_, mut store) = new_store();
        store.register("Ana", "ana@x.com", "secret1")?;

        let result = store.register("Other", "ana@x.com", "different");
        assert!(matches!(result, Err(Error::DuplicateEmail)));
        assert_eq!(store.accounts()?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_email_match_is_case_sensitive() -> Result<()> {
        let (_, mut store) = new_store();
        store.register("Ana", "ana@x.com", "secret1")?;
        store.register("Ana", "ANA@x.com", "secret1")?;
        assert_eq!(store.accounts()?.len(), 2);
        Ok(())
    }

    #[test]
    fn test_authenticate_after_register() -> Result<()> {
        let (storage, mut store) = new_store();
        let registered = store.register("Ana", "ana@x.com", "secret1")?;
        store.end_session()?;

        let session = store.authenticate("ana@x.com", "secret1")?;
        assert_eq!(session, registered);

        let raw = storage.get(AUTH_SESSION_KEY)?.unwrap();
        assert!(!raw.contains("argon2"));
        assert!(!raw.contains("secret1"));
        Ok(())
    }

    #[test]
    fn test_authenticate_failures() -> Result<()> {
        let (_, mut store) = new_store();
        store.register("Ana", "ana@x.com", "secret1")?;
        store.end_session()?;

        assert!(matches!(
            store.authenticate("ana@x.com", "wrong"),
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            store.authenticate("nobody@x.com", "secret1"),
            Err(Error::InvalidCredentials)
        ));
        assert!(store.current().is_none());
        Ok(())
    }

    #[test]
    fn test_registry_never_stores_plaintext() -> Result<()> {
        let (storage, mut store) = new_store();
        store.register("Ana", "ana@x.com", "secret1")?;
        let raw = storage.get(REGISTERED_USERS_KEY)?.unwrap();
        assert!(!raw.contains("secret1"));
        assert!(raw.contains("$argon2id$"));
        Ok(())
    }

    #[test]
    fn test_end_session_is_idempotent() -> Result<()> {
        let (storage, mut store) = new_store();
        store.register("Ana", "ana@x.com", "secret1")?;

        store.end_session()?;
        store.end_session()?;
        assert!(store.current().is_none());
        assert_eq!(storage.get(AUTH_SESSION_KEY)?, None);
        Ok(())
    }

    #[test]
    fn test_restore_session_across_instances() -> Result<()> {
        let (storage, mut store) = new_store();
        let session = store.register("Ana", "ana@x.com", "secret1")?;

        let mut restarted = AccountStore::new(storage.clone());
        assert_eq!(restarted.restore_session()?, Some(session));

        restarted.end_session()?;
        let mut again = AccountStore::new(storage);
        assert_eq!(again.restore_session()?, None);
        Ok(())
    }

    /// Memory store that refuses to save the session record.
    struct NoSessionStore(MemoryStore);

    impl KeyValueStore for NoSessionStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            if key == AUTH_SESSION_KEY {
                return Err(std::io::Error::other("read-only").into());
            }
            self.0.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.0.remove(key)
        }
    }

    #[test]
    fn test_register_rolls_back_when_session_save_fails() -> Result<()> {
        let mut store = AccountStore::new(Arc::new(NoSessionStore(MemoryStore::new())));

        assert!(matches!(
            store.register("Ana", "ana@x.com", "secret1"),
            Err(Error::Io(_))
        ));
        assert!(store.accounts()?.is_empty());
        assert!(store.current().is_none());
        Ok(())
    }

    #[test]
    fn test_corrupt_session_record() -> Result<()> {
        let (storage, mut store) = new_store();
        storage.set(AUTH_SESSION_KEY, "{not json")?;
        assert!(matches!(
            store.restore_session(),
            Err(Error::StorageParseFailure { .. })
        ));
        Ok(())
    }
}
