//! Reading bank and credit card statements.
//!
//! A statement is a CSV file with a header row. Only three columns matter (a date, a description
//! and an amount) and their names differ from bank to bank, so the caller names them with a
//! `ColumnMap`. Rows that cannot be read are dropped rather than failing the whole statement.

use crate::error::{ErrorType, IntoResult, Res};
use crate::model::{Amount, Transaction};
use crate::{utils, Error, Result};
use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, trace};

/// Date formats tried in order. Ambiguous numeric dates are read month first.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%m-%d-%y",
    "%m-%d-%Y",
    "%m.%d.%y",
    "%m.%d.%Y",
    "%Y%m%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%B %d, %Y",
    "%d-%b-%Y",
    "%d-%b-%y",
];

/// The names of the columns holding the three fields a transaction needs.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ColumnMap {
    date: String,
    description: String,
    amount: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self::new("Date", "Description", "Amount")
    }
}

impl ColumnMap {
    pub fn new(
        date: impl Into<String>,
        description: impl Into<String>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            description: description.into(),
            amount: amount.into(),
        }
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn amount(&self) -> &str {
        &self.amount
    }
}

/// Reads a statement file.
///
/// # Errors
/// An `Input` error if the file cannot be read or a named column is missing.
pub async fn load_statement(
    path: &Path,
    columns: &ColumnMap,
    negate: bool,
) -> Result<Vec<Transaction>> {
    let content = utils::read(path).await.pub_result(ErrorType::Input)?;
    read_statement(content.as_bytes(), columns, negate)
}

/// Reads statement CSV data. When `negate` is set every amount changes sign, for statements
/// that write spending as negative numbers.
///
/// # Errors
/// An `Input` error naming the first column of `columns` that is not in the header row.
pub fn read_statement<R: std::io::Read>(
    reader: R,
    columns: &ColumnMap,
    negate: bool,
) -> Result<Vec<Transaction>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .context("Unable to read the statement header row")
        .pub_result(ErrorType::Input)?
        .clone();
    let position = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .or_else(|| headers.iter().position(|h| h.eq_ignore_ascii_case(name)))
            .ok_or_else(|| Error::new(ErrorType::Input, anyhow!("Missing column: {name}")))
    };
    let date_idx = position(columns.date())?;
    let description_idx = position(columns.description())?;
    let amount_idx = position(columns.amount())?;

    let mut transactions = Vec::new();
    let mut dropped = 0usize;
    for (i, row) in reader.records().enumerate() {
        let line = i + 2;
        let parsed = row
            .with_context(|| format!("Unreadable row on line {line}"))
            .and_then(|row| {
                let field = |idx: usize| row.get(idx).unwrap_or_default().to_string();
                parse_row(&field(date_idx), &field(description_idx), &field(amount_idx))
            });
        match parsed {
            Ok(mut transaction) => {
                if negate {
                    transaction.negate();
                }
                transactions.push(transaction);
            }
            Err(e) => {
                trace!("Dropping line {line}: {e:#}");
                dropped += 1;
            }
        }
    }
    debug!(
        "Read {} transactions, dropped {dropped} rows",
        transactions.len()
    );
    Ok(transactions)
}

fn parse_row(date: &str, description: &str, amount: &str) -> Res<Transaction> {
    let date = parse_date(date).with_context(|| format!("Unreadable date '{date}'"))?;
    let merchant = description.trim();
    anyhow::ensure!(!merchant.is_empty(), "Blank description");
    let amount = Amount::from_str(amount)?;
    Ok(Transaction::new(date, merchant, amount))
}

/// Leniently parses a date. A trailing time or other trailing words are ignored, so
/// `10/20/2025 9:15:30 AM` reads as October 20th, 2025.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let tokens: Vec<&str> = s.split_whitespace().collect();
    for n in (1..=tokens.len()).rev() {
        let candidate = tokens[..n].join(" ");
        let candidate = candidate.trim_end_matches([',', '.']);
        if let Some(date) = parse_exact(candidate) {
            return Some(date);
        }
        // ISO 8601 timestamps, e.g. 2025-10-20T09:15:30Z
        if n == 1 {
            if let Some((day, _)) = candidate.split_once('T') {
                return parse_exact(day);
            }
        }
    }
    None
}

fn parse_exact(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;
    use crate::test::TestEnv;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const STATEMENT: &str = "\
Date,Description,Amount,Account
10/20/2025,Whole Foods Market,-$87.43,Credit Card 1
10/19/2025 8:45:12 AM,STARBUCKS #2847,-6.75,Credit Card 1
not a date,Mystery,-1.00,Credit Card 1
2025-10-18,   ,-2.00,Credit Card 1
10/17/25,Payroll,\"$2,500.00\",Checking
10/16/2025,Broken Amount,abc,Checking
10/15/2025,Short Row
";

    #[test]
    fn test_read_statement() {
        let txns = read_statement(STATEMENT.as_bytes(), &ColumnMap::default(), false).unwrap();
        assert_eq!(txns.len(), 3);
        assert_eq!(txns[0].merchant(), "Whole Foods Market");
        assert_eq!(txns[0].date(), ymd(2025, 10, 20));
        assert_eq!(txns[0].amount().to_string(), "-87.43");
        assert_eq!(txns[1].date(), ymd(2025, 10, 19));
        assert_eq!(txns[2].merchant(), "Payroll");
        assert_eq!(txns[2].amount().to_string(), "2500.00");
        assert_eq!(txns[2].date(), ymd(2025, 10, 17));
        assert!(txns.iter().all(|t| !t.is_shared() && t.category().is_none()));
    }

    #[test]
    fn test_negate() {
        let txns = read_statement(STATEMENT.as_bytes(), &ColumnMap::default(), true).unwrap();
        assert_eq!(txns[0].amount().to_string(), "87.43");
        assert_eq!(txns[0].your_share().to_string(), "87.43");
    }

    #[test]
    fn test_missing_column() {
        let columns = ColumnMap::new("Posted", "Description", "Amount");
        let err = read_statement(STATEMENT.as_bytes(), &columns, false).unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Input);
        assert!(err.to_string().contains("Missing column: Posted"));
    }

    #[test]
    fn test_custom_columns() {
        let data = "Posted Date,Payee,Debit\n01/02/2025,SHELL OIL 5543,40.00\n";
        let columns = ColumnMap::new("Posted Date", "payee", "Debit");
        let txns = read_statement(data.as_bytes(), &columns, false).unwrap();
        assert_eq!(txns.len(), 1);
        assert_eq!(txns[0].merchant(), "SHELL OIL 5543");
        assert_eq!(txns[0].date(), ymd(2025, 1, 2));
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = ymd(2025, 3, 4);
        for s in [
            "2025-03-04",
            "03/04/2025",
            "3/4/25",
            "03-04-2025",
            "4 Mar 2025",
            "Mar 4, 2025",
            "March 4 2025",
            "04-Mar-2025",
            "2025-03-04T09:15:30Z",
            "03/04/2025 23:59",
        ] {
            assert_eq!(parse_date(s), Some(expected), "{s}");
        }
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("13/45/2025"), None);
    }

    #[test]
    fn test_ambiguous_is_month_first() {
        assert_eq!(parse_date("01/02/2025"), Some(ymd(2025, 1, 2)));
    }

    #[tokio::test]
    async fn test_load_statement() {
        let env = TestEnv::new().await;
        let path = env.scratch().join("statement.csv");
        utils::write(&path, STATEMENT).await.unwrap();
        let txns = load_statement(&path, &ColumnMap::default(), false)
            .await
            .unwrap();
        assert_eq!(txns.len(), 3);

        let err = load_statement(&env.scratch().join("nope.csv"), &ColumnMap::default(), false)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Input);
    }
}
