//! Versioned JSON snapshots of one account's ledger.
//!
//! Import is validate-then-write: [`parse_backup`] checks the whole document
//! before the ledger touches storage.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::warn;

use crate::{Category, Error, FinancialGoal, Result, Transaction, UserConfig};

pub const BACKUP_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub data: BackupData,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupData {
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub goals: Vec<FinancialGoal>,
    pub categories: Vec<Category>,
    /// `None` means the account had not finished onboarding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_config: Option<UserConfig>,
}

impl Backup {
    pub fn new(user_id: &str, data: BackupData) -> Self {
        Self {
            version: BACKUP_VERSION.to_string(),
            timestamp: Utc::now(),
            user_id: user_id.to_string(),
            data,
        }
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|source| Error::StorageEncode {
            key: "backup".to_string(),
            source,
        })
    }
}

/// Default download name for a backup taken on `date`.
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("rusty_ledger_backup_{}.json", date.format("%Y-%m-%d"))
}

/// Validates a backup document and extracts its ledger data.
///
/// `data.transactions` and `data.categories` must be arrays; `data.goals`
/// and `data.userConfig` may be absent.
pub fn parse_backup(raw: &str) -> Result<BackupData> {
    let document: Value = serde_json::from_str(raw)
        .map_err(|e| Error::invalid_backup(format!("not valid JSON: {e}")))?;

    if let Some(version) = document.get("version").and_then(Value::as_str) {
        if version != BACKUP_VERSION {
            warn!(version, "importing backup with unexpected version");
        }
    }

    let data = document
        .get("data")
        .filter(|d| d.is_object())
        .ok_or_else(|| Error::invalid_backup("missing `data` section"))?;
    for field in ["transactions", "categories"] {
        if !data.get(field).is_some_and(Value::is_array) {
            return Err(Error::invalid_backup(format!(
                "`data.{field}` must be a list"
            )));
        }
    }

    let data = BackupData::deserialize(data)
        .map_err(|e| Error::invalid_backup(format!("malformed ledger data: {e}")))?;
    if data.categories.is_empty() {
        return Err(Error::invalid_backup("backup has no categories"));
    }
    Ok(data)
}

pub async fn read_backup_file(path: impl AsRef<Path>) -> Result<BackupData> {
    let raw = tokio::fs::read_to_string(path).await?;
    parse_backup(&raw)
}

pub async fn write_backup_file(path: impl AsRef<Path>, backup: &Backup) -> Result<()> {
    tokio::fs::write(path, backup.to_pretty_json()?).await?;
    Ok(())
}
