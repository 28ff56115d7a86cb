//! Dashboard aggregates computed from a transaction list.

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{Transaction, TransactionType};

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct Totals {
    pub income: Decimal,
    pub expense: Decimal,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthlyTotal {
    pub year: i32,
    pub month: u32,
    pub income: Decimal,
    pub expense: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FlowPoint {
    pub date: DateTime<Utc>,
    pub amount: Decimal,
}

pub fn totals(transactions: &[Transaction]) -> Totals {
    let mut totals = Totals::default();
    for t in transactions {
        match t.tx_type {
            TransactionType::Income => totals.income += t.amount,
            TransactionType::Expense => totals.expense += t.amount,
        }
    }
    totals.balance = totals.income - totals.expense;
    totals
}

/// Expense totals per category name, in order of first appearance.
pub fn expenses_by_category(transactions: &[Transaction]) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = Vec::new();
    for t in transactions
        .iter()
        .filter(|t| t.tx_type == TransactionType::Expense)
    {
        match totals.iter_mut().find(|c| c.category == t.category) {
            Some(entry) => entry.amount += t.amount,
            None => totals.push(CategoryTotal {
                category: t.category.clone(),
                amount: t.amount,
            }),
        }
    }
    totals
}

/// Income and expense per calendar month, oldest first.
pub fn monthly_totals(transactions: &[Transaction]) -> Vec<MonthlyTotal> {
    let mut months: Vec<MonthlyTotal> = Vec::new();
    for t in transactions {
        let (year, month) = (t.date.year(), t.date.month());
        let index = match months.iter().position(|m| m.year == year && m.month == month) {
            Some(index) => index,
            None => {
                months.push(MonthlyTotal {
                    year,
                    month,
                    income: Decimal::ZERO,
                    expense: Decimal::ZERO,
                });
                months.len() - 1
            }
        };
        match t.tx_type {
            TransactionType::Income => months[index].income += t.amount,
            TransactionType::Expense => months[index].expense += t.amount,
        }
    }
    months.sort_by_key(|m| (m.year, m.month));
    months
}

/// Signed amounts of the last `count` recorded transactions, in recording order.
pub fn recent_flow(transactions: &[Transaction], count: usize) -> Vec<FlowPoint> {
    let start = transactions.len().saturating_sub(count);
    transactions[start..]
        .iter()
        .map(|t| FlowPoint {
            date: t.date,
            amount: t.signed_amount(),
        })
        .collect()
}

/// Case-insensitive match on description or category, newest first.
pub fn search<'a>(transactions: &'a [Transaction], query: &str) -> Vec<&'a Transaction> {
    let query = query.to_lowercase();
    let mut found: Vec<_> = transactions
        .iter()
        .filter(|t| {
            t.description.to_lowercase().contains(&query)
                || t.category.to_lowercase().contains(&query)
        })
        .collect();
    found.sort_by(|a, b| b.date.cmp(&a.date));
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn tx(id: &str, kind: TransactionType, amount: Decimal, category: &str, ymd: (i32, u32, u32)) -> Transaction {
        Transaction {
            id: id.into(),
            description: format!("{category} {id}"),
            amount,
            date: Utc.with_ymd_and_hms(ymd.0, ymd.1, ymd.2, 12, 0, 0).unwrap(),
            category: category.into(),
            tx_type: kind,
        }
    }

    fn sample() -> Vec<Transaction> {
        use TransactionType::*;
        vec![
            tx("1", Income, dec!(3000), "Salary", (2024, 2, 5)),
            tx("2", Expense, dec!(120.50), "Food", (2024, 2, 10)),
            tx("3", Expense, dec!(80), "Transport", (2024, 1, 15)),
            tx("4", Expense, dec!(30), "Food", (2024, 3, 1)),
            tx("5", Income, dec!(200), "Investment", (2024, 3, 2)),
        ]
    }

    #[test]
    fn test_totals() {
        let totals = totals(&sample());
        assert_eq!(totals.income, dec!(3200));
        assert_eq!(totals.expense, dec!(230.50));
        assert_eq!(totals.balance, dec!(2969.50));
    }

    #[test]
    fn test_empty_totals() {
        assert_eq!(totals(&[]), Totals::default());
    }

    #[test]
    fn test_expenses_by_category() {
        let by_category = expenses_by_category(&sample());
        assert_eq!(
            by_category,
            vec![
                CategoryTotal {
                    category: "Food".into(),
                    amount: dec!(150.50)
                },
                CategoryTotal {
                    category: "Transport".into(),
                    amount: dec!(80)
                },
            ]
        );
    }

    #[test]
    fn test_monthly_totals_sorted() {
        let months = monthly_totals(&sample());
        let keys: Vec<_> = months.iter().map(|m| (m.year, m.month)).collect();
        assert_eq!(keys, [(2024, 1), (2024, 2), (2024, 3)]);
        assert_eq!(months[1].income, dec!(3000));
        assert_eq!(months[1].expense, dec!(120.50));
        assert_eq!(months[2].income, dec!(200));
    }

    #[test]
    fn test_recent_flow() {
        let flow = recent_flow(&sample(), 2);
        let amounts: Vec<_> = flow.iter().map(|p| p.amount).collect();
        assert_eq!(amounts, [dec!(-30), dec!(200)]);
        assert_eq!(recent_flow(&sample(), 50).len(), 5);
    }

    #[test]
    fn test_search() {
        let transactions = sample();
        let ids: Vec<_> = search(&transactions, "FOOD").iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, ["4", "2"]);
        assert_eq!(search(&transactions, "").len(), 5);
        assert!(search(&transactions, "rent").is_empty());
    }
}
