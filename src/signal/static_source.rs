//! Implements `SignalSource` using in-memory data.
//!
//! Note: this is compiled even in the "production" version of this app so that the whole CLI can
//! run, top-to-bottom, without touching the network. See `Mode::Test`.

use crate::error::Res;
use crate::memory::normalize_key;
use crate::signal::SignalSource;

/// Answers from a fixed table. An entry matches when its key appears anywhere in the normalized
/// query, and the first matching entry wins.
#[derive(Debug, Clone)]
pub struct StaticSource {
    entries: Vec<(String, String)>,
}

impl StaticSource {
    pub fn new<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (normalize_key(k.as_ref()), v.into()))
                .collect(),
        }
    }
}

impl Default for StaticSource {
    /// Seeded with a handful of well known merchants.
    fn default() -> Self {
        Self::new(SEED)
    }
}

#[async_trait::async_trait]
impl SignalSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch(&self, query: &str) -> Res<Option<String>> {
        let query = normalize_key(query);
        Ok(self
            .entries
            .iter()
            .find(|(key, _)| !key.is_empty() && query.contains(key.as_str()))
            .map(|(_, text)| text.clone()))
    }
}

const SEED: [(&str, &str); 8] = [
    (
        "WHOLE FOODS",
        "Whole Foods Market, Oakland, shop supermarket",
    ),
    ("STARBUCKS", "Starbucks, Telegraph Avenue, amenity cafe"),
    (
        "WALMART",
        "Walmart Supercenter, Bentonville, shop department_store",
    ),
    ("SHELL", "Shell, Grand Avenue, amenity fuel"),
    (
        "DELTA",
        "Delta Air Lines, Inc. is a major airline of the United States.",
    ),
    ("CVS", "CVS Pharmacy, Telegraph Avenue, amenity pharmacy"),
    (
        "NETFLIX",
        "Netflix is an American subscription video on-demand streaming service and movie studio.",
    ),
    (
        "COMCAST",
        "Comcast is an American telecommunications company offering cable internet and phone service.",
    ),
];
