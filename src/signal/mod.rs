//! Best-effort hints about a merchant from outside sources.
//!
//! A `SignalSource` turns a merchant name into a piece of descriptive text. `ExternalSignals` asks
//! each of its sources in turn, stops at the first one that has something to say, and hands the
//! text to the `KeywordClassifier`. Failures never escape: a source that times out, returns a bad
//! status or sends garbage simply has nothing to say.

mod place;
mod static_source;
mod summary;

use crate::classify::KeywordClassifier;
use crate::config::OnlineSettings;
use crate::error::{ErrorType, IntoResult, Res};
use crate::model::Category;
use crate::{Config, Result};
use anyhow::Context;
use std::time::Duration;
use tracing::{debug, trace};

pub use place::PlaceSource;
pub use static_source::StaticSource;
pub use summary::SummarySource;

/// The environment variable that switches the CLI to canned, offline signal sources.
pub const TEST_MODE_ENV: &str = "SPENDWISE_IN_TEST_MODE";

/// Whether external sources are real web services or canned in-memory data.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Live,
    Test,
}

impl Mode {
    /// `Mode::Test` when `SPENDWISE_IN_TEST_MODE` is set to a non-empty value.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Live,
        }
    }
}

/// A single external knowledge source.
#[async_trait::async_trait]
pub trait SignalSource: Send + Sync {
    /// A short name used in logs.
    fn name(&self) -> &str;

    /// Returns descriptive text for `query`, `Ok(None)` when the source has no result.
    async fn fetch(&self, query: &str) -> Res<Option<String>>;
}

/// Turns a merchant name into a category guess.
#[async_trait::async_trait]
pub trait SignalProvider: Send + Sync {
    /// Descriptive text for `name` from the first source that has any.
    async fn describe(&self, name: &str) -> Option<String>;

    /// `describe` followed by keyword classification.
    async fn guess(&self, name: &str) -> Option<Category>;
}

/// An ordered list of sources, a fixed delay before each call, and the classifier that reads the
/// text they return.
pub struct ExternalSignals {
    sources: Vec<Box<dyn SignalSource>>,
    classifier: KeywordClassifier,
    delay: Duration,
}

impl ExternalSignals {
    pub fn new(
        sources: Vec<Box<dyn SignalSource>>,
        classifier: KeywordClassifier,
        delay: Duration,
    ) -> Self {
        Self {
            sources,
            classifier,
            delay,
        }
    }

    /// The place source followed by the summary source, or the static source in `Mode::Test`.
    pub fn from_config(config: &Config, mode: Mode) -> Result<Self> {
        let classifier = KeywordClassifier::builtin().pub_result(ErrorType::Internal)?;
        if mode == Mode::Test {
            debug!("Using canned signal sources");
            return Ok(Self::new(
                vec![Box::new(StaticSource::default())],
                classifier,
                Duration::ZERO,
            ));
        }
        let online = config.online();
        let sources = live_sources(online).pub_result(ErrorType::Config)?;
        Ok(Self::new(
            sources,
            classifier,
            Duration::from_millis(online.delay_ms()),
        ))
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.name())
    }
}

fn live_sources(online: &OnlineSettings) -> Res<Vec<Box<dyn SignalSource>>> {
    let client = http_client(online)?;
    Ok(vec![
        Box::new(PlaceSource::new(client.clone(), online.place_endpoint())?),
        Box::new(SummarySource::new(
            client,
            online.summary_endpoint(),
            online.summary_chars(),
        )?),
    ])
}

/// An HTTP client with the configured timeout and User-Agent.
pub(crate) fn http_client(online: &OnlineSettings) -> Res<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(online.timeout_secs()))
        .user_agent(online.user_agent())
        .build()
        .context("Unable to build the HTTP client")
}

#[async_trait::async_trait]
impl SignalProvider for ExternalSignals {
    async fn describe(&self, name: &str) -> Option<String> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        for source in &self.sources {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match source.fetch(name).await {
                Ok(Some(text)) if !text.trim().is_empty() => {
                    trace!("{} described '{name}' as '{text}'", source.name());
                    return Some(text);
                }
                Ok(_) => debug!("{} has nothing for '{name}'", source.name()),
                Err(e) => debug!("{} failed for '{name}': {e:#}", source.name()),
            }
        }
        None
    }

    async fn guess(&self, name: &str) -> Option<Category> {
        let text = self.describe(name).await?;
        let category = self.classifier.classify(&text);
        debug!(
            "Guessed {} for '{name}'",
            category
                .as_ref()
                .map(Category::label)
                .unwrap_or("nothing")
        );
        category
    }
}
