use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

pub const DEFAULT_CURRENCY: &str = "R$";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Income,
    Expense,
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(Error::validation(format!(
                "unknown transaction type `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub description: String,
    pub amount: Decimal,
    pub date: DateTime<Utc>,
    /// Category name. Not kept in sync with category renames.
    pub category: String,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
}

impl Transaction {
    /// Amount with the sign of its direction: income positive, expense negative.
    pub fn signed_amount(&self) -> Decimal {
        match self.tx_type {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinancialGoal {
    pub id: String,
    pub name: String,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub deadline: Option<NaiveDate>,
}

impl FinancialGoal {
    /// Share of the target reached, clamped to `[0, 1]`.
    pub fn progress(&self) -> Decimal {
        if self.target_amount <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        // Overflow only happens when current dwarfs the target.
        self.current_amount
            .checked_div(self.target_amount)
            .map_or(Decimal::ONE, |ratio| ratio.clamp(Decimal::ZERO, Decimal::ONE))
    }

    pub fn is_complete(&self) -> bool {
        self.progress() == Decimal::ONE
    }
}

/// Accepts `null`, a missing field, `""` or `YYYY-MM-DD`.
fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub color: String,
}

/// Partial update applied to a [`Category`]; `None` fields stay as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl Category {
    pub fn apply(&mut self, patch: CategoryPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
    }
}

/// The categories every new account starts with.
pub fn default_categories() -> Vec<Category> {
    [
        ("1", "Food", "#3b82f6"),
        ("2", "Transport", "#10b981"),
        ("3", "Leisure", "#f59e0b"),
        ("4", "Health", "#ef4444"),
        ("5", "Education", "#8b5cf6"),
        ("6", "Housing", "#ec4899"),
        ("7", "Salary", "#059669"),
        ("8", "Investment", "#2563eb"),
        ("9", "Other", "#64748b"),
    ]
    .into_iter()
    .map(|(id, name, color)| Category {
        id: id.to_string(),
        name: name.to_string(),
        color: color.to_string(),
    })
    .collect()
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserProfile {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
    Student,
    Freelancer,
}

impl fmt::Display for UserProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Conservative => "CONSERVATIVE",
            Self::Moderate => "MODERATE",
            Self::Aggressive => "AGGRESSIVE",
            Self::Student => "STUDENT",
            Self::Freelancer => "FREELANCER",
        };
        f.write_str(s)
    }
}

impl FromStr for UserProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CONSERVATIVE" => Ok(Self::Conservative),
            "MODERATE" => Ok(Self::Moderate),
            "AGGRESSIVE" => Ok(Self::Aggressive),
            "STUDENT" => Ok(Self::Student),
            "FREELANCER" => Ok(Self::Freelancer),
            other => Err(Error::validation(format!("unknown profile `{other}`"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    pub name: String,
    pub profile: UserProfile,
    pub monthly_income_goal: Decimal,
    pub currency: String,
}

impl UserConfig {
    /// What an account sees before onboarding.
    pub fn unconfigured(name: &str) -> Self {
        Self {
            name: name.to_string(),
            profile: UserProfile::Moderate,
            monthly_income_goal: Decimal::ZERO,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

/// A registered local identity. `password_hash` is a PHC string and never
/// leaves the account registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

/// Public identity of the signed-in account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&Account> for Session {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
        }
    }
}
