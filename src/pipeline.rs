//! The merchant resolution pipeline.
//!
//! Each distinct merchant description moves through these states:
//!
//! ```text
//! Unseen -> MemoryChecked -> Resolved(Memory)
//!                         -> ExternalChecked -> Resolved(External)
//!                                            -> AwaitingManual -> Resolved(Manual)
//! ```
//!
//! The memory is always asked first. Online signals are only consulted when the pipeline is told
//! to use them and a provider was given. Whatever is left waits for a human, who confirms a
//! category through `confirm`, which also teaches the memory.

use crate::error::{ErrorType, IntoResult};
use crate::memory::MerchantMemory;
use crate::model::{Category, Transaction};
use crate::signal::SignalProvider;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};

/// Which step produced a merchant's category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedBy {
    Memory,
    External,
    Manual,
}

serde_plain::derive_display_from_serialize!(ResolvedBy);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MerchantState {
    Unseen,
    MemoryChecked,
    ExternalChecked { suggestion: Option<Category> },
    /// Needs a human. `suggestion` is the online guess, if there was one, to offer as a default.
    AwaitingManual { suggestion: Option<Category> },
    Resolved { category: Category, by: ResolvedBy },
}

impl MerchantState {
    pub fn is_resolved(&self) -> bool {
        matches!(self, MerchantState::Resolved { .. })
    }
}

/// A merchant that still needs a human decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pending {
    pub merchant: String,
    pub suggestion: Option<Category>,
}

/// Counts from one `resolve` call, over the distinct merchants in that batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveSummary {
    pub merchants: usize,
    pub memory: usize,
    pub external: usize,
    pub manual: usize,
    pub pending: usize,
}

/// Resolves merchant descriptions to categories for one session.
pub struct ResolutionPipeline {
    memory: Box<dyn MerchantMemory>,
    provider: Option<Box<dyn SignalProvider>>,
    use_external: bool,
    auto_accept_external: bool,
    merchants: Vec<(String, MerchantState)>,
    index: HashMap<String, usize>,
}

impl ResolutionPipeline {
    /// A pipeline that only uses `memory`. Add online signals with `with_provider`.
    pub fn new(memory: Box<dyn MerchantMemory>) -> Self {
        Self {
            memory,
            provider: None,
            use_external: false,
            auto_accept_external: true,
            merchants: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Consult `provider` for merchants the memory does not know.
    pub fn with_provider(mut self, provider: Box<dyn SignalProvider>) -> Self {
        self.provider = Some(provider);
        self.use_external = true;
        self
    }

    /// Turns the online step on or off without removing the provider.
    pub fn use_external(mut self, on: bool) -> Self {
        self.use_external = on;
        self
    }

    /// When off, an online guess only becomes the suggested default for the manual step.
    pub fn auto_accept_external(mut self, on: bool) -> Self {
        self.auto_accept_external = on;
        self
    }

    pub fn memory(&self) -> &dyn MerchantMemory {
        self.memory.as_ref()
    }

    /// Resolves every distinct description in `descriptions` as far as memory and online signals
    /// allow. Merchants resolved earlier in the session are kept. Any other merchant in the batch
    /// starts over, so a mapping learned since the last call is picked up.
    pub async fn resolve<I, S>(&mut self, descriptions: I) -> ResolveSummary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut batch: Vec<usize> = Vec::new();
        for description in descriptions {
            let i = self.slot(description.as_ref());
            if !batch.contains(&i) {
                batch.push(i);
            }
        }

        let mut summary = ResolveSummary {
            merchants: batch.len(),
            ..ResolveSummary::default()
        };

        for &i in &batch {
            let (merchant, state) = &mut self.merchants[i];
            if !state.is_resolved() {
                *state = MerchantState::Unseen;
            }

            if *state == MerchantState::Unseen {
                *state = match self.memory.lookup(merchant) {
                    Some(hit) => {
                        trace!(
                            "'{merchant}' matched '{}' ({}) in memory",
                            hit.merchant,
                            hit.score
                        );
                        MerchantState::Resolved {
                            category: hit.category,
                            by: ResolvedBy::Memory,
                        }
                    }
                    None => MerchantState::MemoryChecked,
                };
            }

            if *state == MerchantState::MemoryChecked {
                *state = match self.provider.as_deref().filter(|_| self.use_external) {
                    Some(provider) => MerchantState::ExternalChecked {
                        suggestion: provider.guess(merchant).await,
                    },
                    None => MerchantState::AwaitingManual { suggestion: None },
                };
            }

            if let MerchantState::ExternalChecked { suggestion } = state {
                *state = match suggestion.take() {
                    Some(category) if self.auto_accept_external => MerchantState::Resolved {
                        category,
                        by: ResolvedBy::External,
                    },
                    suggestion => MerchantState::AwaitingManual { suggestion },
                };
            }

            match state {
                MerchantState::Resolved { by, .. } => match by {
                    ResolvedBy::Memory => summary.memory += 1,
                    ResolvedBy::External => summary.external += 1,
                    ResolvedBy::Manual => summary.manual += 1,
                },
                _ => summary.pending += 1,
            }
        }

        debug!(
            "Resolved {} merchants: {} from memory, {} online, {} manually, {} pending",
            summary.merchants, summary.memory, summary.external, summary.manual, summary.pending
        );
        summary
    }

    /// Merchants waiting for a human, in the order they were first seen.
    pub fn pending(&self) -> Vec<Pending> {
        self.merchants
            .iter()
            .filter_map(|(merchant, state)| match state {
                MerchantState::AwaitingManual { suggestion } => Some(Pending {
                    merchant: merchant.clone(),
                    suggestion: suggestion.clone(),
                }),
                _ => None,
            })
            .collect()
    }

    /// Records a human decision: the memory learns it and the merchant is resolved for the rest
    /// of the session. Other pending merchants are not revisited until the next `resolve`.
    ///
    /// # Errors
    /// - `Input` if `category` is blank or `Uncategorized`.
    /// - `Storage` if the memory cannot be persisted.
    ///
    /// Either way the merchant stays unresolved.
    pub async fn confirm(&mut self, description: &str, category: Category) -> Result<()> {
        let category = category.validated().pub_result(ErrorType::Input)?;
        self.memory.learn(description, &category).await?;
        let i = self.slot(description);
        self.merchants[i].1 = MerchantState::Resolved {
            category,
            by: ResolvedBy::Manual,
        };
        Ok(())
    }

    pub fn state_of(&self, description: &str) -> Option<&MerchantState> {
        self.index.get(description).map(|&i| &self.merchants[i].1)
    }

    /// The category of a resolved merchant.
    pub fn category_of(&self, description: &str) -> Option<&Category> {
        match self.state_of(description)? {
            MerchantState::Resolved { category, .. } => Some(category),
            _ => None,
        }
    }

    /// Sets each transaction's category from its merchant. Unresolved merchants leave the category
    /// empty. Returns the number of categorized transactions.
    pub fn apply(&self, transactions: &mut [Transaction]) -> usize {
        let mut categorized = 0;
        for t in transactions.iter_mut() {
            let category = self.category_of(t.merchant()).cloned();
            if category.is_some() {
                categorized += 1;
            }
            t.set_category(category);
        }
        categorized
    }

    /// The index of `description`, adding it as `Unseen` if it is new.
    fn slot(&mut self, description: &str) -> usize {
        if let Some(&i) = self.index.get(description) {
            return i;
        }
        let i = self.merchants.len();
        self.merchants
            .push((description.to_string(), MerchantState::Unseen));
        self.index.insert(description.to_string(), i);
        i
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryMatch, MerchantMap, MerchantRecord};
    use crate::model::Amount;
    use crate::test::TestEnv;
    use crate::Error;
    use chrono::NaiveDate;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Answers from a table and counts calls.
    struct Counting {
        answers: HashMap<String, Category>,
        calls: Arc<AtomicUsize>,
    }

    fn counting(answers: &[(&str, Category)]) -> (Box<dyn SignalProvider>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = Counting {
            answers: answers
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            calls: calls.clone(),
        };
        (Box::new(provider), calls)
    }

    #[async_trait::async_trait]
    impl SignalProvider for Counting {
        async fn describe(&self, name: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answers.get(name).map(|c| c.to_string())
        }

        async fn guess(&self, name: &str) -> Option<Category> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answers.get(name).cloned()
        }
    }

    /// A memory whose writes always fail.
    struct ReadOnly;

    #[async_trait::async_trait]
    impl MerchantMemory for ReadOnly {
        fn lookup(&self, _description: &str) -> Option<MemoryMatch> {
            None
        }

        async fn learn(&mut self, _description: &str, _category: &Category) -> Result<()> {
            Err(Error::new(
                ErrorType::Storage,
                anyhow::anyhow!("read-only file system"),
            ))
        }

        async fn forget(&mut self, _description: &str) -> Result<bool> {
            Ok(false)
        }

        fn records(&self) -> &[MerchantRecord] {
            &[]
        }
    }

    fn txn(merchant: &str, amount: &str) -> Transaction {
        Transaction::new(
            NaiveDate::from_ymd_opt(2025, 10, 20).unwrap(),
            merchant,
            Amount::from_str(amount).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_memory_hit_skips_external() {
        let env = TestEnv::new().await;
        let map = env
            .seed_merchants(&[("Amazon.com", Category::Shopping)])
            .await;
        let (provider, calls) = counting(&[]);
        let mut pipeline = ResolutionPipeline::new(Box::new(map)).with_provider(provider);

        let summary = pipeline.resolve(["AMAZON.COM*AB12CD"]).await;
        assert_eq!(summary.memory, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            pipeline.category_of("AMAZON.COM*AB12CD"),
            Some(&Category::Shopping)
        );
        assert_eq!(
            pipeline.state_of("AMAZON.COM*AB12CD"),
            Some(&MerchantState::Resolved {
                category: Category::Shopping,
                by: ResolvedBy::Memory
            })
        );
    }

    #[tokio::test]
    async fn test_duplicate_merchant_one_lookup() {
        let env = TestEnv::new().await;
        let map = MerchantMap::from_config(&env.config()).await.unwrap();
        let (provider, calls) = counting(&[("WALMART #2291", Category::Shopping)]);
        let mut pipeline = ResolutionPipeline::new(Box::new(map)).with_provider(provider);

        let mut txns = vec![
            txn("WALMART #2291", "45.10"),
            txn("WALMART #2291", "12.00"),
        ];
        let summary = pipeline.resolve(txns.iter().map(|t| t.merchant())).await;
        assert_eq!(summary.merchants, 1);
        assert_eq!(summary.external, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        assert_eq!(pipeline.apply(&mut txns), 2);
        assert_eq!(txns[0].category(), Some(&Category::Shopping));
        assert_eq!(txns[0].category(), txns[1].category());
    }

    #[tokio::test]
    async fn test_duplicate_merchant_one_prompt() {
        let env = TestEnv::new().await;
        let map = MerchantMap::from_config(&env.config()).await.unwrap();
        let mut pipeline = ResolutionPipeline::new(Box::new(map));

        let summary = pipeline.resolve(["ZZQX 4411", "ZZQX 4411"]).await;
        assert_eq!(summary.pending, 1);
        assert_eq!(pipeline.pending().len(), 1);
    }

    #[tokio::test]
    async fn test_external_off() {
        let env = TestEnv::new().await;
        let map = MerchantMap::from_config(&env.config()).await.unwrap();
        let (provider, calls) = counting(&[("WALMART #2291", Category::Shopping)]);
        let mut pipeline = ResolutionPipeline::new(Box::new(map))
            .with_provider(provider)
            .use_external(false);

        let summary = pipeline.resolve(["WALMART #2291"]).await;
        assert_eq!(summary.pending, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            pipeline.pending(),
            vec![Pending {
                merchant: "WALMART #2291".into(),
                suggestion: None
            }]
        );
    }

    #[tokio::test]
    async fn test_guess_as_suggestion_only() {
        let env = TestEnv::new().await;
        let map = MerchantMap::from_config(&env.config()).await.unwrap();
        let (provider, _) = counting(&[("SHELL OIL 5543", Category::Transport)]);
        let mut pipeline = ResolutionPipeline::new(Box::new(map))
            .with_provider(provider)
            .auto_accept_external(false);

        pipeline.resolve(["SHELL OIL 5543"]).await;
        assert_eq!(pipeline.category_of("SHELL OIL 5543"), None);
        assert_eq!(
            pipeline.pending()[0].suggestion,
            Some(Category::Transport)
        );
    }

    #[tokio::test]
    async fn test_graceful_degradation() {
        let env = TestEnv::new().await;
        let map = MerchantMap::from_config(&env.config()).await.unwrap();
        let (provider, calls) = counting(&[]);
        let mut pipeline = ResolutionPipeline::new(Box::new(map)).with_provider(provider);

        let summary = pipeline.resolve(["ZZQX 4411", "QQQ 12"]).await;
        assert_eq!(summary.pending, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(pipeline.pending().iter().all(|p| p.suggestion.is_none()));
    }

    #[tokio::test]
    async fn test_confirm_learns_and_resolves() {
        let env = TestEnv::new().await;
        let map = MerchantMap::from_config(&env.config()).await.unwrap();
        let mut pipeline = ResolutionPipeline::new(Box::new(map));

        pipeline.resolve(["ZZQX 4411"]).await;
        pipeline
            .confirm("ZZQX 4411", Category::Custom("Pets".into()))
            .await
            .unwrap();
        assert_eq!(
            pipeline.state_of("ZZQX 4411"),
            Some(&MerchantState::Resolved {
                category: Category::Custom("Pets".into()),
                by: ResolvedBy::Manual
            })
        );
        assert!(pipeline.pending().is_empty());
        assert_eq!(pipeline.memory().records().len(), 1);

        // A resolve in the same session keeps the manual decision.
        let summary = pipeline.resolve(["ZZQX 4411"]).await;
        assert_eq!(summary.manual, 1);

        // A new session finds it in memory.
        let map = MerchantMap::from_config(&env.config()).await.unwrap();
        let mut next = ResolutionPipeline::new(Box::new(map));
        let summary = next.resolve(["zzqx 4411"]).await;
        assert_eq!(summary.memory, 1);
    }

    #[tokio::test]
    async fn test_reresolve_picks_up_learned_mapping() {
        let env = TestEnv::new().await;
        let map = MerchantMap::from_config(&env.config()).await.unwrap();
        let mut pipeline = ResolutionPipeline::new(Box::new(map));

        pipeline
            .resolve(["STARBUCKS #2847", "STARBUCKS #2847 SEATTLE"])
            .await;
        assert_eq!(pipeline.pending().len(), 2);

        pipeline
            .confirm("STARBUCKS #2847", Category::FoodAndDrink)
            .await
            .unwrap();
        // not revisited until resolve is called again
        assert_eq!(pipeline.category_of("STARBUCKS #2847 SEATTLE"), None);

        let summary = pipeline
            .resolve(["STARBUCKS #2847", "STARBUCKS #2847 SEATTLE"])
            .await;
        assert_eq!(summary.manual, 1);
        assert_eq!(summary.memory, 1);
        assert_eq!(
            pipeline.category_of("STARBUCKS #2847 SEATTLE"),
            Some(&Category::FoodAndDrink)
        );
    }

    #[tokio::test]
    async fn test_resolved_external_not_requeried() {
        let env = TestEnv::new().await;
        let map = MerchantMap::from_config(&env.config()).await.unwrap();
        let (provider, calls) = counting(&[("DELTA AIR 0062", Category::Travel)]);
        let mut pipeline = ResolutionPipeline::new(Box::new(map)).with_provider(provider);

        pipeline.resolve(["DELTA AIR 0062"]).await;
        pipeline.resolve(["DELTA AIR 0062"]).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // An online guess is not written to memory.
        assert!(pipeline.memory().records().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_storage_error() {
        let mut pipeline = ResolutionPipeline::new(Box::new(ReadOnly));
        pipeline.resolve(["ZZQX 4411"]).await;
        let err = pipeline
            .confirm("ZZQX 4411", Category::Other)
            .await
            .unwrap_err();
        assert!(err.is_storage());
        assert_eq!(pipeline.pending().len(), 1);
    }

    #[tokio::test]
    async fn test_apply_leaves_unresolved_empty() {
        let mut pipeline = ResolutionPipeline::new(Box::new(ReadOnly));
        let mut txns = vec![txn("ZZQX 4411", "1.00")];
        pipeline.resolve(txns.iter().map(Transaction::merchant)).await;
        assert_eq!(pipeline.apply(&mut txns), 0);
        assert_eq!(txns[0].category(), None);
    }

    #[tokio::test]
    async fn test_confirm_rejects_reserved_category() {
        let env = TestEnv::new().await;
        let map = MerchantMap::from_config(&env.config()).await.unwrap();
        let mut pipeline = ResolutionPipeline::new(Box::new(map));
        pipeline.resolve(["ZZQX 4411"]).await;

        for bad in ["Uncategorized", " "] {
            let err = pipeline
                .confirm("ZZQX 4411", Category::Custom(bad.into()))
                .await
                .unwrap_err();
            assert_eq!(err.error_type(), ErrorType::Input, "{bad:?}");
        }
        assert_eq!(pipeline.pending().len(), 1);
        assert!(pipeline.memory().records().is_empty());
        let reloaded = MerchantMap::from_config(&env.config()).await.unwrap();
        assert!(reloaded.is_empty());
    }

    #[tokio::test]
    async fn test_confirm_trims_custom_category() {
        let env = TestEnv::new().await;
        let map = MerchantMap::from_config(&env.config()).await.unwrap();
        let mut pipeline = ResolutionPipeline::new(Box::new(map));
        pipeline.resolve(["ZZQX 4411"]).await;
        pipeline
            .confirm("ZZQX 4411", Category::Custom(" Pets ".into()))
            .await
            .unwrap();

        let pets = Category::Custom("Pets".into());
        assert_eq!(pipeline.category_of("ZZQX 4411"), Some(&pets));
        let reloaded = MerchantMap::from_config(&env.config()).await.unwrap();
        assert_eq!(reloaded.lookup("ZZQX 4411").unwrap().category, pets);
    }
}
