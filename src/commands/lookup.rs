use crate::classify::KeywordClassifier;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::memory::{MemoryMatch, MerchantMap, MerchantMemory};
use crate::model::Category;
use crate::signal::{ExternalSignals, Mode, SignalProvider};
use crate::{Config, Result};
use serde::Serialize;
use tracing::debug;

/// Looks `merchant` up in the merchant map without touching the network.
pub async fn lookup(config: &Config, merchant: &str) -> Result<Out<Option<MemoryMatch>>> {
    let map = MerchantMap::from_config(config).await?;
    let found = map.lookup(merchant);
    let message = match &found {
        Some(m) => format!(
            "'{}' is {} (matched '{}', score {})",
            merchant.trim(),
            m.category,
            m.merchant,
            m.score
        ),
        None => format!(
            "'{}' is not in the merchant map (threshold {})",
            merchant.trim(),
            map.threshold()
        ),
    };
    Ok(Out::new(message, found))
}

/// What the online sources said about a merchant.
#[derive(Debug, Clone, Serialize)]
pub struct Guess {
    pub description: Option<String>,
    pub category: Option<Category>,
}

/// Asks the online sources about `merchant` and shows the text they returned along with the
/// category it implies. Nothing is saved. When `online.enabled` is off nothing is asked.
pub async fn guess(config: &Config, mode: Mode, merchant: &str) -> Result<Out<Guess>> {
    if !config.online().enabled() {
        debug!("Online lookups are off");
        return Ok(Out::new(
            "Online lookups are turned off in config.json",
            Guess {
                description: None,
                category: None,
            },
        ));
    }
    let signals = ExternalSignals::from_config(config, mode)?;
    let classifier = KeywordClassifier::builtin().pub_result(ErrorType::Internal)?;
    let description = signals.describe(merchant).await;
    let category = description
        .as_deref()
        .and_then(|text| classifier.classify(text));
    let message = match (&description, &category) {
        (Some(text), Some(category)) => format!("{category}: {text}"),
        (Some(text), None) => format!("No category for: {text}"),
        (None, _) => format!("Nothing found for '{}'", merchant.trim()),
    };
    Ok(Out::new(
        message,
        Guess {
            description,
            category,
        },
    ))
}
