//! Encyclopedia summary lookup against a MediaWiki-compatible `api.php` endpoint.

use crate::error::Res;
use crate::signal::SignalSource;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

/// Searches for an article by name and returns the start of its plain-text introduction.
///
/// This takes two requests: a full-text search for the best matching title, then the intro
/// extract of that title. The extract is cut to `max_chars` characters.
#[derive(Debug, Clone)]
pub struct SummarySource {
    client: reqwest::Client,
    endpoint: Url,
    max_chars: usize,
}

#[derive(Debug, Deserialize)]
struct Response<T> {
    query: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct PagesQuery {
    #[serde(default)]
    pages: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    #[serde(default)]
    extract: Option<String>,
}

impl SummarySource {
    pub fn new(client: reqwest::Client, endpoint: &str, max_chars: usize) -> Res<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("Invalid summary endpoint '{endpoint}'"))?;
        Ok(Self {
            client,
            endpoint,
            max_chars,
        })
    }

    fn url(&self, params: &[(&str, &str)]) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("action", "query")
                .append_pair("format", "json")
                .append_pair("formatversion", "2");
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        url
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Res<Option<T>> {
        let response: Response<T> = self
            .client
            .get(url)
            .send()
            .await
            .context("Summary request failed")?
            .error_for_status()
            .context("Summary request returned an error status")?
            .json()
            .await
            .context("Unable to parse the summary response")?;
        Ok(response.query)
    }

    async fn top_title(&self, query: &str) -> Res<Option<String>> {
        let url = self.url(&[("list", "search"), ("srsearch", query), ("srlimit", "1")]);
        let found: Option<SearchQuery> = self.get(url).await?;
        Ok(found.and_then(|q| q.search.into_iter().next().map(|hit| hit.title)))
    }

    async fn extract(&self, title: &str) -> Res<Option<String>> {
        let url = self.url(&[
            ("prop", "extracts"),
            ("exintro", "1"),
            ("explaintext", "1"),
            ("redirects", "1"),
            ("titles", title),
        ]);
        let found: Option<PagesQuery> = self.get(url).await?;
        Ok(found
            .and_then(|q| q.pages.into_iter().next())
            .and_then(|page| page.extract))
    }
}

#[async_trait::async_trait]
impl SignalSource for SummarySource {
    fn name(&self) -> &str {
        "summary"
    }

    async fn fetch(&self, query: &str) -> Res<Option<String>> {
        let Some(title) = self.top_title(query).await? else {
            return Ok(None);
        };
        let Some(extract) = self.extract(&title).await? else {
            return Ok(None);
        };
        let text: String = extract.trim().chars().take(self.max_chars).collect();
        Ok((!text.is_empty()).then_some(text))
    }
}
