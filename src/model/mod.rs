//! Types that represent the core data model, such as `Transaction` and `Category`.
mod amount;
mod category;
mod transaction;

pub use amount::{Amount, AmountError};
pub use category::{label_or_uncategorized, Category, UNCATEGORIZED};
pub use transaction::Transaction;
