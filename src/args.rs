//! These structs provide the CLI interface for the spendwise CLI.

use crate::report::Split;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// spendwise: categorize the transactions in a bank or credit card statement.
///
/// Every merchant in the statement is looked up in your merchant map, a CSV file of decisions you
/// have made before. Merchants it does not know are looked up online and, failing that, you are
/// asked. Your answers are saved so the next statement needs fewer of them.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory with a default config.json and an empty merchant map.
    ///
    /// Running it again leaves an existing configuration and merchant map alone.
    Init,
    /// Categorize a statement CSV and write the categorized transactions.
    Categorize(CategorizeArgs),
    /// Save a category for a merchant.
    Learn(LearnArgs),
    /// Remove a merchant from the merchant map.
    Forget(MerchantArgs),
    /// Show what the merchant map says about a merchant.
    Lookup(MerchantArgs),
    /// Show what the online sources say about a merchant, without saving anything.
    Guess(MerchantArgs),
    /// List every merchant in the merchant map.
    Mappings,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where the merchant map and configuration are kept. Defaults to ~/spendwise
    #[arg(long, env = "SPENDWISE_HOME", default_value_t = default_spendwise_home())]
    spendwise_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, spendwise_home: PathBuf) -> Self {
        Self {
            log_level,
            spendwise_home: spendwise_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn spendwise_home(&self) -> &DisplayPath {
        &self.spendwise_home
    }
}

/// (Not shown): Args for the `spendwise categorize` command.
#[derive(Debug, Parser, Clone)]
pub struct CategorizeArgs {
    /// The statement CSV file.
    file: PathBuf,

    /// The header of the column holding the transaction date.
    #[arg(long, default_value = "Date")]
    date_column: String,

    /// The header of the column holding the merchant description.
    #[arg(long, default_value = "Description")]
    description_column: String,

    /// The header of the column holding the amount.
    #[arg(long, default_value = "Amount")]
    amount_column: String,

    /// Flip the sign of every amount, for statements that show spending as negative numbers.
    #[arg(long)]
    negate: bool,

    /// Do not look merchants up online.
    #[arg(long)]
    offline: bool,

    /// Do not ask about unknown merchants. They are left uncategorized.
    #[arg(long)]
    no_prompt: bool,

    /// Mark a merchant's transactions as shared, e.g. --split "COSTCO WHOLESALE=0.5" keeps half
    /// of each as your share. May be given more than once.
    #[arg(long = "split", value_name = "MERCHANT=SHARE")]
    splits: Vec<Split>,

    /// Write the categorized statement here instead of to stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl CategorizeArgs {
    /// Default columns, online lookups and prompting on, no splits, output to stdout.
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            date_column: "Date".to_string(),
            description_column: "Description".to_string(),
            amount_column: "Amount".to_string(),
            negate: false,
            offline: false,
            no_prompt: false,
            splits: Vec::new(),
            output: None,
        }
    }

    pub fn with_date_column(mut self, name: impl Into<String>) -> Self {
        self.date_column = name.into();
        self
    }

    pub fn with_description_column(mut self, name: impl Into<String>) -> Self {
        self.description_column = name.into();
        self
    }

    pub fn with_amount_column(mut self, name: impl Into<String>) -> Self {
        self.amount_column = name.into();
        self
    }

    pub fn with_negate(mut self, negate: bool) -> Self {
        self.negate = negate;
        self
    }

    pub fn with_offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn with_no_prompt(mut self, no_prompt: bool) -> Self {
        self.no_prompt = no_prompt;
        self
    }

    pub fn with_splits(mut self, splits: Vec<Split>) -> Self {
        self.splits = splits;
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn date_column(&self) -> &str {
        &self.date_column
    }

    pub fn description_column(&self) -> &str {
        &self.description_column
    }

    pub fn amount_column(&self) -> &str {
        &self.amount_column
    }

    pub fn negate(&self) -> bool {
        self.negate
    }

    pub fn offline(&self) -> bool {
        self.offline
    }

    pub fn no_prompt(&self) -> bool {
        self.no_prompt
    }

    pub fn splits(&self) -> &[Split] {
        &self.splits
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }
}

/// (Not shown): Args for the `spendwise learn` command.
#[derive(Debug, Parser, Clone)]
pub struct LearnArgs {
    /// The merchant description, as it appears on your statement.
    merchant: String,

    /// One of the standard categories, e.g. "Food & Drink", or a name of your own.
    category: String,
}

impl LearnArgs {
    pub fn new(merchant: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            merchant: merchant.into(),
            category: category.into(),
        }
    }

    pub fn merchant(&self) -> &str {
        &self.merchant
    }

    pub fn category(&self) -> &str {
        &self.category
    }
}

/// (Not shown): Args for commands that take a single merchant.
#[derive(Debug, Parser, Clone)]
pub struct MerchantArgs {
    /// The merchant description, as it appears on your statement.
    merchant: String,
}

impl MerchantArgs {
    pub fn new(merchant: impl Into<String>) -> Self {
        Self {
            merchant: merchant.into(),
        }
    }

    pub fn merchant(&self) -> &str {
        &self.merchant
    }
}

fn default_spendwise_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("spendwise"),
        None => {
            error!(
                "Unable to find your home directory. Pass --spendwise-home or set SPENDWISE_HOME \
                to choose where spendwise keeps its data, otherwise a 'spendwise' directory in \
                the current directory is used."
            );
            PathBuf::from("spendwise")
        }
    })
}

/// A `PathBuf` that implements `Display` so it can be used as a clap default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
