//! Place lookup against a Nominatim-compatible search endpoint.

use crate::error::Res;
use crate::signal::SignalSource;
use anyhow::Context;
use serde::Deserialize;
use url::Url;

/// Searches for a place by name and describes the top hit by its display name, class and type,
/// e.g. `Blue Bottle Coffee, Broadway, Oakland amenity cafe`.
#[derive(Debug, Clone)]
pub struct PlaceSource {
    client: reqwest::Client,
    endpoint: Url,
}

#[derive(Debug, Deserialize)]
struct Place {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    class: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

impl PlaceSource {
    pub fn new(client: reqwest::Client, endpoint: &str) -> Res<Self> {
        let endpoint =
            Url::parse(endpoint).with_context(|| format!("Invalid place endpoint '{endpoint}'"))?;
        Ok(Self { client, endpoint })
    }

    fn url(&self, query: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("format", "json")
            .append_pair("limit", "1");
        url
    }
}

#[async_trait::async_trait]
impl SignalSource for PlaceSource {
    fn name(&self) -> &str {
        "place"
    }

    async fn fetch(&self, query: &str) -> Res<Option<String>> {
        let places: Vec<Place> = self
            .client
            .get(self.url(query))
            .send()
            .await
            .context("Place search request failed")?
            .error_for_status()
            .context("Place search returned an error status")?
            .json()
            .await
            .context("Unable to parse the place search response")?;

        let Some(top) = places.into_iter().next() else {
            return Ok(None);
        };
        let text = [top.display_name, top.class, top.kind]
            .into_iter()
            .flatten()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Ok((!text.is_empty()).then_some(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::MockServer;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use std::collections::HashMap;
    use std::time::Duration;

    async fn search(Query(params): Query<HashMap<String, String>>) -> (StatusCode, String) {
        let ok = params.get("format").map(String::as_str) == Some("json")
            && params.get("limit").map(String::as_str) == Some("1");
        if !ok {
            return (StatusCode::BAD_REQUEST, String::new());
        }
        let body = match params.get("q").map(String::as_str) {
            Some("Blue Bottle") => {
                r#"[{"display_name":"Blue Bottle Coffee, Broadway, Oakland","class":"amenity","type":"cafe"}]"#
            }
            Some("broken") => "{not json",
            Some("boom") => return (StatusCode::INTERNAL_SERVER_ERROR, "oops".into()),
            Some("partial") => r#"[{"display_name":"  ","class":"shop"}]"#,
            _ => "[]",
        };
        (StatusCode::OK, body.to_string())
    }

    async fn slow() -> &'static str {
        tokio::time::sleep(Duration::from_secs(2)).await;
        "[]"
    }

    async fn source() -> (MockServer, PlaceSource) {
        let server = MockServer::start(
            Router::new()
                .route("/search", get(search))
                .route("/slow", get(slow)),
        )
        .await;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(200))
            .build()
            .unwrap();
        let source = PlaceSource::new(client, &format!("{}/search", server.url())).unwrap();
        (server, source)
    }

    #[tokio::test]
    async fn test_top_result_text() {
        let (_server, source) = source().await;
        let text = source.fetch("Blue Bottle").await.unwrap().unwrap();
        assert_eq!(text, "Blue Bottle Coffee, Broadway, Oakland amenity cafe");
    }

    #[tokio::test]
    async fn test_empty_results() {
        let (_server, source) = source().await;
        assert_eq!(source.fetch("ZZQX 4411").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_fields_are_skipped() {
        let (_server, source) = source().await;
        assert_eq!(source.fetch("partial").await.unwrap().as_deref(), Some("shop"));
    }

    #[tokio::test]
    async fn test_error_status() {
        let (_server, source) = source().await;
        assert!(source.fetch("boom").await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let (_server, source) = source().await;
        assert!(source.fetch("broken").await.is_err());
    }

    #[tokio::test]
    async fn test_timeout() {
        let (server, _) = source().await;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        let slow = PlaceSource::new(client, &format!("{}/slow", server.url())).unwrap();
        assert!(slow.fetch("anything").await.is_err());
    }

    #[test]
    fn test_url_encodes_query() {
        let source =
            PlaceSource::new(reqwest::Client::new(), "https://example.com/search").unwrap();
        let url = source.url("AMAZON.COM*AB12 CD");
        assert_eq!(
            url.as_str(),
            "https://example.com/search?q=AMAZON.COM*AB12+CD&format=json&limit=1"
        );
    }

    #[test]
    fn test_invalid_endpoint() {
        assert!(PlaceSource::new(reqwest::Client::new(), "not a url").is_err());
    }
}
