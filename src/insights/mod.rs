//! AI-generated financial insights.
//!
//! A provider turns the ledger into a handful of short insights. Callers go
//! through [`fetch_insights`], which never fails: any provider error becomes a
//! single warning entry.

mod gemini;
mod prompt;

pub use gemini::GeminiProvider;
pub use prompt::build_prompt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::{FinancialGoal, Result, Transaction, UserConfig};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Tip,
    Warning,
    Prediction,
}

impl fmt::Display for InsightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tip => "tip",
            Self::Warning => "warning",
            Self::Prediction => "prediction",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Insight {
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: InsightKind,
}

#[async_trait]
pub trait InsightProvider: Send + Sync {
    async fn insights(
        &self,
        transactions: &[Transaction],
        config: &UserConfig,
        goals: &[FinancialGoal],
    ) -> Result<Vec<Insight>>;
}

/// Shown in place of real insights when the provider fails.
pub fn unavailable_insight() -> Insight {
    Insight {
        title: "Unable to load insights".to_string(),
        message: "Check your connection and try again later.".to_string(),
        kind: InsightKind::Warning,
    }
}

pub async fn fetch_insights<P: InsightProvider + ?Sized>(
    provider: &P,
    transactions: &[Transaction],
    config: &UserConfig,
    goals: &[FinancialGoal],
) -> Vec<Insight> {
    match provider.insights(transactions, config, goals).await {
        Ok(insights) => insights,
        Err(e) => {
            warn!(error = %e, "falling back to placeholder insight");
            vec![unavailable_insight()]
        }
    }
}
