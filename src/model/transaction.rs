use crate::model::{Amount, Category};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single statement line after ingestion.
///
/// The resolution pipeline only ever reads `merchant`; the remaining fields belong to the
/// statement, split and report code.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Transaction {
    pub(crate) date: NaiveDate,
    pub(crate) merchant: String,
    pub(crate) amount: Amount,
    pub(crate) category: Option<Category>,
    pub(crate) is_shared: bool,
    pub(crate) your_share: Amount,
}

impl Transaction {
    /// A new, unshared and uncategorized transaction. `your_share` starts out as the full amount.
    pub fn new(date: NaiveDate, merchant: impl Into<String>, amount: Amount) -> Self {
        Self {
            date,
            merchant: merchant.into(),
            amount,
            category: None,
            is_shared: false,
            your_share: amount,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn merchant(&self) -> &str {
        &self.merchant
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn category(&self) -> Option<&Category> {
        self.category.as_ref()
    }

    pub fn set_category(&mut self, category: Option<Category>) {
        self.category = category;
    }

    pub fn is_shared(&self) -> bool {
        self.is_shared
    }

    pub fn your_share(&self) -> Amount {
        self.your_share
    }

    /// Flips the sign of the amount (and of `your_share`) for statements that use negative
    /// numbers for spending.
    pub fn negate(&mut self) {
        self.amount = -self.amount;
        self.your_share = -self.your_share;
    }

    /// Marks the transaction as shared, keeping `share` (0..=1) of the amount as yours.
    pub fn share(&mut self, share: Decimal) {
        self.is_shared = true;
        self.your_share = self.amount.portion(share);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn txn(amount: &str) -> Transaction {
        Transaction::new(
            NaiveDate::from_ymd_opt(2025, 10, 20).unwrap(),
            "Whole Foods Market",
            Amount::from_str(amount).unwrap(),
        )
    }

    #[test]
    fn test_new_is_unshared() {
        let t = txn("87.43");
        assert!(!t.is_shared());
        assert_eq!(t.your_share(), t.amount());
        assert!(t.category().is_none());
    }

    #[test]
    fn test_negate_flips_share_too() {
        let mut t = txn("-87.43");
        t.negate();
        assert_eq!(t.amount().to_string(), "87.43");
        assert_eq!(t.your_share().to_string(), "87.43");
    }

    #[test]
    fn test_share() {
        let mut t = txn("60.00");
        t.share(Decimal::from_str("0.25").unwrap());
        assert!(t.is_shared());
        assert_eq!(t.your_share().to_string(), "15.00");
        assert_eq!(t.amount().to_string(), "60.00");
    }
}
