//! The merchant memory: confirmed merchant to category decisions that survive restarts.
//!
//! `MerchantMemory` is the seam the resolution pipeline talks to. `MerchantMap` is the CSV-backed
//! implementation used by the CLI.

mod merchant_map;

use crate::model::Category;
use crate::Result;
use serde::{Deserialize, Serialize};

pub use merchant_map::MerchantMap;

/// The default minimum similarity score for a fuzzy lookup to count as a hit.
pub const DEFAULT_THRESHOLD: u8 = 85;

/// Normalizes a merchant description into the key used for storage and lookup.
pub fn normalize_key(description: &str) -> String {
    description.trim().to_uppercase()
}

/// One confirmed merchant decision.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct MerchantRecord {
    merchant: String,
    merchant_key: String,
    category: Category,
}

impl MerchantRecord {
    pub fn new(merchant: impl Into<String>, category: Category) -> Self {
        let merchant = merchant.into().trim().to_string();
        let merchant_key = normalize_key(&merchant);
        Self {
            merchant,
            merchant_key,
            category,
        }
    }

    /// The merchant as it was first written.
    pub fn merchant(&self) -> &str {
        &self.merchant
    }

    pub fn merchant_key(&self) -> &str {
        &self.merchant_key
    }

    pub fn category(&self) -> &Category {
        &self.category
    }
}

/// A successful fuzzy lookup.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct MemoryMatch {
    pub category: Category,
    /// Similarity score in `0..=100`.
    pub score: u8,
    /// The stored merchant that matched.
    pub merchant: String,
}

/// A durable merchant to category memory with fuzzy lookup.
///
/// Writes are persisted before `learn` or `forget` return. If persisting fails the in-memory state
/// has already changed, and the caller should retry or reload.
#[async_trait::async_trait]
pub trait MerchantMemory: Send + Sync {
    /// Finds the stored merchant most similar to `description`, if it scores at or above the
    /// threshold. Ties go to the record stored first.
    fn lookup(&self, description: &str) -> Option<MemoryMatch>;

    /// Stores `category` for `description`, overwriting any existing category for the same key.
    async fn learn(&mut self, description: &str, category: &Category) -> Result<()>;

    /// Removes the record whose key is exactly `description`'s key. Returns whether one existed.
    async fn forget(&mut self, description: &str) -> Result<bool>;

    /// All records in storage order.
    fn records(&self) -> &[MerchantRecord];
}
