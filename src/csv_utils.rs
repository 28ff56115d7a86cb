//! CSV export of transactions for spreadsheets.

use serde::Serialize;
use std::io::Write;

use crate::{Transaction, TransactionType};

/// One exported line per transaction.
#[derive(Debug, Serialize, PartialEq)]
pub struct TransactionRow {
    pub date: String,
    pub description: String,
    pub category: String,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub amount: String,
    pub id: String,
}

impl From<&Transaction> for TransactionRow {
    fn from(t: &Transaction) -> Self {
        Self {
            date: t.date.format("%Y-%m-%d").to_string(),
            description: t.description.clone(),
            category: t.category.clone(),
            tx_type: t.tx_type,
            amount: t.amount.normalize().to_string(),
            id: t.id.clone(),
        }
    }
}

/// Writes an iterator of records to a CSV writer.
/// Each record must implement Serialize.
pub fn write_csv<T, W>(writer: W, records: impl Iterator<Item = T>) -> csv::Result<()>
where
    T: Serialize,
    W: Write,
{
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_transactions<W: Write>(writer: W, transactions: &[Transaction]) -> csv::Result<()> {
    write_csv(writer, transactions.iter().map(TransactionRow::from))
}
