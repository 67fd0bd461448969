use crate::config::SearchConfig;
use crate::error::GatewayError;
use crate::models::{EvidenceItem, EvidenceSet};
use crate::pipeline::traits::EvidenceSearch;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// Web search through the Tavily API.
pub struct TavilySearch {
    client: Client,
    endpoint: Url,
    api_key: String,
    search_depth: String,
    include_answer: bool,
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
    include_answer: bool,
}

#[derive(Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    content: Option<String>,
}

impl TavilyResponse {
    fn into_evidence(self) -> EvidenceSet {
        EvidenceSet {
            answer: self.answer,
            items: self
                .results
                .into_iter()
                .map(|r| {
                    EvidenceItem::new(
                        r.title.unwrap_or_default(),
                        r.content.unwrap_or_default(),
                        r.url.unwrap_or_default(),
                    )
                })
                .collect(),
        }
    }
}

impl TavilySearch {
    pub fn new(api_key: &str, config: &SearchConfig) -> Result<Self, GatewayError> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| GatewayError::new(format!("invalid search endpoint: {e}")))?;
        let client = Client::builder()
            .user_agent(concat!("factcheck/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            client,
            endpoint,
            api_key: api_key.to_string(),
            search_depth: config.search_depth.clone(),
            include_answer: config.include_answer,
        })
    }
}

#[async_trait]
impl EvidenceSearch for TavilySearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<EvidenceSet, GatewayError> {
        let body = TavilyRequest {
            api_key: &self.api_key,
            query,
            search_depth: &self.search_depth,
            max_results,
            include_answer: self.include_answer,
        };
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let detail: String = response.text().await.unwrap_or_default().chars().take(200).collect();
            return Err(GatewayError::new(format!("search returned {status}: {detail}")));
        }
        let parsed: TavilyResponse = response.json().await?;
        let mut set = parsed.into_evidence();
        set.items.truncate(max_results);
        debug!(query, results = set.items.len(), "search completed");
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_maps_to_evidence_in_order() {
        let raw = r#"{
            "answer": "Bitcoin trades near $67,000.",
            "results": [
                {"title": "BTC price", "url": "https://a.example/btc", "content": "BTC at 67k", "score": 0.9},
                {"title": "Markets", "url": "https://b.example/m", "content": null}
            ]
        }"#;
        let parsed: TavilyResponse = serde_json::from_str(raw).unwrap();
        let set = parsed.into_evidence();
        assert_eq!(set.answer.as_deref(), Some("Bitcoin trades near $67,000."));
        assert_eq!(set.items.len(), 2);
        assert_eq!(set.items[0].snippet, "BTC at 67k");
        assert_eq!(set.items[1].snippet, "");
    }

    #[test]
    fn missing_fields_are_tolerated() {
        let parsed: TavilyResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.into_evidence(), EvidenceSet::empty());
    }

    #[test]
    fn rejects_bad_endpoint() {
        let config = SearchConfig {
            endpoint: "not a url".to_string(),
            ..SearchConfig::default()
        };
        assert!(TavilySearch::new("tvly-x", &config).is_err());
    }
}
