//! Shared expenses, totals and the categorized export.

use crate::error::{ErrorType, IntoResult, Res};
use crate::memory::normalize_key;
use crate::model::{label_or_uncategorized, Amount, Transaction};
use crate::{utils, Result};
use anyhow::{anyhow, ensure, Context};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;

/// Marks every transaction from `merchant` as shared, keeping `share` of it as yours.
///
/// Parsed from `MERCHANT=SHARE`, e.g. `COSTCO WHOLESALE=0.5`. The share must be between 0 and 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    merchant: String,
    share: Decimal,
}

impl Split {
    pub fn new(merchant: impl Into<String>, share: Decimal) -> Res<Self> {
        let merchant = merchant.into().trim().to_string();
        ensure!(!merchant.is_empty(), "A split needs a merchant");
        ensure!(
            share >= Decimal::ZERO && share <= Decimal::ONE,
            "The share for '{merchant}' must be between 0 and 1, got {share}"
        );
        Ok(Self { merchant, share })
    }

    pub fn merchant(&self) -> &str {
        &self.merchant
    }

    pub fn share(&self) -> Decimal {
        self.share
    }
}

impl FromStr for Split {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (merchant, share) = s
            .rsplit_once('=')
            .ok_or_else(|| anyhow!("Expected MERCHANT=SHARE, got '{s}'"))?;
        let share = Decimal::from_str(share.trim())
            .with_context(|| format!("Invalid share '{}'", share.trim()))?;
        Split::new(merchant, share)
    }
}

/// Applies each split to the transactions whose merchant has the same key. Returns the number of
/// transactions marked shared.
pub fn apply_splits(transactions: &mut [Transaction], splits: &[Split]) -> usize {
    let mut shared = 0;
    for t in transactions.iter_mut() {
        let key = normalize_key(t.merchant());
        if let Some(split) = splits.iter().find(|s| normalize_key(&s.merchant) == key) {
            t.share(split.share);
            shared += 1;
        }
    }
    shared
}

/// Your share of spending in one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: String,
    pub your_share: Amount,
}

/// Statement totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub transactions: usize,
    /// Sum of every amount.
    pub total: Amount,
    /// Sum of every `your_share`.
    pub your_total: Amount,
    /// Largest first, ties by name.
    pub by_category: Vec<CategoryTotal>,
}

impl Totals {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let mut sums: BTreeMap<&str, Amount> = BTreeMap::new();
        for t in transactions {
            let entry = sums
                .entry(label_or_uncategorized(t.category()))
                .or_default();
            *entry = *entry + t.your_share();
        }
        let mut by_category: Vec<CategoryTotal> = sums
            .into_iter()
            .map(|(category, your_share)| CategoryTotal {
                category: category.to_string(),
                your_share,
            })
            .collect();
        by_category.sort_by(|a, b| {
            b.your_share
                .cmp(&a.your_share)
                .then_with(|| a.category.cmp(&b.category))
        });

        Self {
            transactions: transactions.len(),
            total: transactions.iter().map(Transaction::amount).sum(),
            your_total: transactions.iter().map(Transaction::your_share).sum(),
            by_category,
        }
    }
}

impl Display for Totals {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Transactions: {}", self.transactions)?;
        writeln!(f, "Total:        {}", self.total.to_money())?;
        writeln!(f, "Your total:   {}", self.your_total.to_money())?;
        let width = self
            .by_category
            .iter()
            .map(|c| c.category.chars().count())
            .max()
            .unwrap_or(0);
        for c in &self.by_category {
            writeln!(
                f,
                "  {:<width$}  {:>12}",
                c.category,
                c.your_share.to_money()
            )?;
        }
        Ok(())
    }
}

/// One row of the categorized export.
#[derive(Debug, Serialize)]
struct ExportRow<'a> {
    date: String,
    merchant: &'a str,
    category: &'a str,
    amount: Amount,
    is_shared: bool,
    your_share: Amount,
}

impl<'a> From<&'a Transaction> for ExportRow<'a> {
    fn from(t: &'a Transaction) -> Self {
        Self {
            date: t.date().format("%Y-%m-%d").to_string(),
            merchant: t.merchant(),
            category: label_or_uncategorized(t.category()),
            amount: t.amount(),
            is_shared: t.is_shared(),
            your_share: t.your_share(),
        }
    }
}

/// Writes the categorized statement as CSV with the columns
/// `date,merchant,category,amount,is_shared,your_share`.
pub fn write_csv<W: std::io::Write>(writer: W, transactions: &[Transaction]) -> Result<()> {
    write_inner(writer, transactions).pub_result(ErrorType::Internal)
}

fn write_inner<W: std::io::Write>(writer: W, transactions: &[Transaction]) -> Res<()> {
    let mut writer = csv::Writer::from_writer(writer);
    if transactions.is_empty() {
        writer.write_record([
            "date",
            "merchant",
            "category",
            "amount",
            "is_shared",
            "your_share",
        ])?;
    }
    for t in transactions {
        writer
            .serialize(ExportRow::from(t))
            .with_context(|| format!("Unable to write the row for '{}'", t.merchant()))?;
    }
    writer.flush().context("Unable to flush the export")?;
    Ok(())
}

/// Writes the categorized statement to `path`.
pub async fn export(path: &Path, transactions: &[Transaction]) -> Result<()> {
    let mut data = Vec::new();
    write_csv(&mut data, transactions)?;
    utils::write(path, data).await.pub_result(ErrorType::Input)
}
