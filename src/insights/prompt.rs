use crate::{Error, FinancialGoal, Result, Transaction, UserConfig};

/// Builds the analysis prompt from the profile, goals and the latest
/// `recent` transactions.
pub fn build_prompt(
    transactions: &[Transaction],
    config: &UserConfig,
    goals: &[FinancialGoal],
    recent: usize,
) -> Result<String> {
    let start = transactions.len().saturating_sub(recent);
    let goals = serde_json::to_string(goals).map_err(|e| Error::Insights(e.to_string()))?;
    let latest = serde_json::to_string(&transactions[start..])
        .map_err(|e| Error::Insights(e.to_string()))?;

    Ok(format!(
        "Analyze this user's financial situation and provide 3 smart, actionable insights.\n\
         \n\
         User Profile: {profile}\n\
         Monthly Income Goal: {income_goal}\n\
         Currency: {currency}\n\
         \n\
         Current Goals: {goals}\n\
         \n\
         Recent Transactions (Last {recent}): {latest}\n\
         \n\
         Provide insights that include a title, a short message, and a type ('tip', 'warning', or 'prediction').\n\
         Be concise and professional.",
        profile = config.profile,
        income_goal = config.monthly_income_goal,
        currency = config.currency,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TransactionType, UserProfile};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn tx(id: usize) -> Transaction {
        Transaction {
            id: format!("tx-{id}"),
            description: "Coffee".into(),
            amount: dec!(4.5),
            date: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            category: "Food".into(),
            tx_type: TransactionType::Expense,
        }
    }

    #[test]
    fn test_prompt_includes_profile_and_latest_transactions() {
        let transactions: Vec<_> = (0..25).map(tx).collect();
        let config = UserConfig {
            name: "Ana".into(),
            profile: UserProfile::Freelancer,
            monthly_income_goal: dec!(4000),
            currency: "EUR".into(),
        };

        let prompt = build_prompt(&transactions, &config, &[], 20).unwrap();
        assert!(prompt.contains("User Profile: FREELANCER"));
        assert!(prompt.contains("Monthly Income Goal: 4000"));
        assert!(prompt.contains("Currency: EUR"));
        assert!(prompt.contains("Current Goals: []"));
        assert!(prompt.contains("tx-24"));
        assert!(prompt.contains("tx-5\""));
        assert!(!prompt.contains("tx-4\""));
    }
}
