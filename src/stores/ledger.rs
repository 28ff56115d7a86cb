//! Per-account ledger: transactions, goals, categories and user configuration.
//!
//! Every mutation takes the caller's [`Session`] and persists the whole
//! affected collection under `{account_id}_{collection}` before returning.
//! Subscribers are told about each change through [`LedgerEvent`]s.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::backup::{parse_backup, Backup, BackupData};
use crate::storage::{read_json, write_json, Collection, KeyValueStore};
use crate::{
    default_categories, Category, CategoryPatch, Error, FinancialGoal, Result, Session,
    Transaction, UserConfig,
};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    /// All collections were (re)loaded for this account, or reset when `None`.
    Loaded { account_id: Option<String> },
    /// One collection was changed and persisted.
    Changed(Collection),
}

pub struct LedgerStore<S> {
    storage: Arc<S>,
    owner: Option<Session>,
    transactions: Vec<Transaction>,
    goals: Vec<FinancialGoal>,
    categories: Vec<Category>,
    /// `None` until onboarding is complete.
    config: Option<UserConfig>,
    events: broadcast::Sender<LedgerEvent>,
}

impl<S: KeyValueStore> LedgerStore<S> {
    pub fn new(storage: Arc<S>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            storage,
            owner: None,
            transactions: Vec::new(),
            goals: Vec::new(),
            categories: default_categories(),
            config: None,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    /// Loads the collections of `session`'s account, or resets to defaults
    /// when `None`. On a read failure the previous state is kept.
    pub fn switch_account(&mut self, session: Option<&Session>) -> Result<()> {
        let Some(session) = session else {
            self.owner = None;
            self.transactions = Vec::new();
            self.goals = Vec::new();
            self.categories = default_categories();
            self.config = None;
            debug!("ledger reset");
            self.publish(LedgerEvent::Loaded { account_id: None });
            return Ok(());
        };

        let storage = &*self.storage;
        let id = session.id.as_str();
        let transactions: Option<Vec<Transaction>> =
            read_json(storage, &Collection::Transactions.key(id))?;
        let goals: Option<Vec<FinancialGoal>> = read_json(storage, &Collection::Goals.key(id))?;
        let categories: Option<Vec<Category>> =
            read_json(storage, &Collection::Categories.key(id))?;
        let config: Option<UserConfig> = read_json(storage, &Collection::UserConfig.key(id))?;

        self.transactions = transactions.unwrap_or_default();
        self.goals = goals.unwrap_or_default();
        self.categories = categories.unwrap_or_else(default_categories);
        self.config = config;
        self.owner = Some(session.clone());

        debug!(
            account_id = %id,
            transactions = self.transactions.len(),
            goals = self.goals.len(),
            categories = self.categories.len(),
            configured = self.config.is_some(),
            "ledger loaded"
        );
        self.publish(LedgerEvent::Loaded {
            account_id: Some(session.id.clone()),
        });
        Ok(())
    }

    /// Account whose collections are loaded.
    pub fn owner(&self) -> Option<&Session> {
        self.owner.as_ref()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn goals(&self) -> &[FinancialGoal] {
        &self.goals
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// True once a [`UserConfig`] has been persisted for the loaded account.
    pub fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    /// The persisted configuration, or the onboarding defaults.
    pub fn user_config(&self) -> UserConfig {
        match (&self.config, &self.owner) {
            (Some(config), _) => config.clone(),
            (None, Some(owner)) => UserConfig::unconfigured(&owner.name),
            (None, None) => UserConfig::unconfigured(""),
        }
    }

    pub fn add_transaction(&mut self, session: &Session, transaction: Transaction) -> Result<()> {
        check_non_negative("transaction amount", transaction.amount)?;
        self.scope(session)?;
        let mut transactions = self.transactions.clone();
        transactions.push(transaction);
        self.save(Collection::Transactions, &transactions)?;
        self.transactions = transactions;
        Ok(())
    }

    pub fn delete_transaction(&mut self, session: &Session, id: &str) -> Result<()> {
        self.scope(session)?;
        let mut transactions = self.transactions.clone();
        transactions.retain(|t| t.id != id);
        self.save(Collection::Transactions, &transactions)?;
        self.transactions = transactions;
        Ok(())
    }

    pub fn add_goal(&mut self, session: &Session, goal: FinancialGoal) -> Result<()> {
        if goal.target_amount <= Decimal::ZERO {
            return Err(Error::validation("goal target must be greater than zero"));
        }
        check_non_negative("goal amount", goal.current_amount)?;
        self.scope(session)?;
        let mut goals = self.goals.clone();
        goals.push(goal);
        self.save(Collection::Goals, &goals)?;
        self.goals = goals;
        Ok(())
    }

    pub fn delete_goal(&mut self, session: &Session, id: &str) -> Result<()> {
        self.scope(session)?;
        let mut goals = self.goals.clone();
        goals.retain(|g| g.id != id);
        self.save(Collection::Goals, &goals)?;
        self.goals = goals;
        Ok(())
    }

    /// Replaces the saved amount of a goal; other fields are untouched.
    pub fn update_goal_amount(
        &mut self,
        session: &Session,
        id: &str,
        amount: Decimal,
    ) -> Result<()> {
        check_non_negative("goal amount", amount)?;
        self.scope(session)?;
        let mut goals = self.goals.clone();
        if let Some(goal) = goals.iter_mut().find(|g| g.id == id) {
            goal.current_amount = amount;
        }
        self.save(Collection::Goals, &goals)?;
        self.goals = goals;
        Ok(())
    }

    pub fn add_category(&mut self, session: &Session, category: Category) -> Result<()> {
        self.scope(session)?;
        let mut categories = self.categories.clone();
        categories.push(category);
        self.save(Collection::Categories, &categories)?;
        self.categories = categories;
        Ok(())
    }

    /// Merges `patch` into the category with `id`. Transactions keep the
    /// category name they were recorded with.
    pub fn update_category(
        &mut self,
        session: &Session,
        id: &str,
        patch: CategoryPatch,
    ) -> Result<()> {
        self.scope(session)?;
        let mut categories = self.categories.clone();
        if let Some(category) = categories.iter_mut().find(|c| c.id == id) {
            category.apply(patch);
        }
        self.save(Collection::Categories, &categories)?;
        self.categories = categories;
        Ok(())
    }

    /// Removes a category. The last remaining category cannot be removed;
    /// the attempt leaves the ledger untouched.
    pub fn delete_category(&mut self, session: &Session, id: &str) -> Result<()> {
        self.scope(session)?;
        if self.categories.len() <= 1 {
            return Err(Error::CategoryDeletionRejected);
        }
        let mut categories = self.categories.clone();
        categories.retain(|c| c.id != id);
        self.save(Collection::Categories, &categories)?;
        self.categories = categories;
        Ok(())
    }

    /// Completes onboarding by saving the whole configuration.
    pub fn set_user_config(&mut self, session: &Session, config: UserConfig) -> Result<()> {
        check_non_negative("monthly income goal", config.monthly_income_goal)?;
        self.scope(session)?;
        self.save(Collection::UserConfig, &config)?;
        self.config = Some(config);
        Ok(())
    }

    pub fn export_backup(&mut self, session: &Session) -> Result<Backup> {
        self.scope(session)?;
        let backup = Backup::new(
            &session.id,
            BackupData {
                transactions: self.transactions.clone(),
                goals: self.goals.clone(),
                categories: self.categories.clone(),
                user_config: self.config.clone(),
            },
        );
        info!(account_id = %session.id, "exported backup");
        Ok(backup)
    }

    /// Validates a backup document and, only if it is valid, overwrites all
    /// four collections of the account and reloads them.
    ///
    /// A backup without `userConfig` leaves the account unconfigured.
    pub fn import_backup(&mut self, session: &Session, raw: &str) -> Result<()> {
        let data = parse_backup(raw)?;
        self.restore(session, data)
    }

    /// Writes already-validated backup data for the account and reloads.
    pub fn restore(&mut self, session: &Session, data: BackupData) -> Result<()> {
        if data.categories.is_empty() {
            return Err(Error::invalid_backup("backup has no categories"));
        }
        let storage = &*self.storage;
        let id = session.id.as_str();
        write_json(storage, &Collection::Transactions.key(id), &data.transactions)?;
        write_json(storage, &Collection::Goals.key(id), &data.goals)?;
        write_json(storage, &Collection::Categories.key(id), &data.categories)?;
        match &data.user_config {
            Some(config) => write_json(storage, &Collection::UserConfig.key(id), config)?,
            None => storage.remove(&Collection::UserConfig.key(id))?,
        }
        info!(
            account_id = %id,
            transactions = data.transactions.len(),
            goals = data.goals.len(),
            categories = data.categories.len(),
            "imported backup"
        );
        self.switch_account(Some(session))
    }

    /// Makes sure the loaded collections belong to `session`'s account.
    fn scope(&mut self, session: &Session) -> Result<()> {
        let loaded = self.owner.as_ref().is_some_and(|o| o.id == session.id);
        if !loaded {
            self.switch_account(Some(session))?;
        }
        Ok(())
    }

    /// Writes the new value of a collection. Callers swap it into memory
    /// only once this succeeds.
    fn save<T: Serialize + ?Sized>(&self, collection: Collection, value: &T) -> Result<()> {
        let owner = self.owner.as_ref().ok_or(Error::NoActiveSession)?;
        write_json(&*self.storage, &collection.key(&owner.id), value)?;
        self.publish(LedgerEvent::Changed(collection));
        Ok(())
    }

    fn publish(&self, event: LedgerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn check_non_negative(what: &str, amount: Decimal) -> Result<()> {
    if amount < Decimal::ZERO {
        return Err(Error::validation(format!("{what} cannot be negative")));
    }
    Ok(())
}
