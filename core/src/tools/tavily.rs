//! Tavily search and extraction, offered next to the key-less tools as an
//! alternative the model can switch to.

use crate::tools::content_reader::page_excerpt;
use crate::tools::http_client;
use crate::traits::{Tool, ToolInput};
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

const TAVILY_API: &str = "https://api.tavily.com";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TavilyResult {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ExtractRequest<'a> {
    urls: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    results: Vec<ExtractResult>,
}

#[derive(Debug, Deserialize)]
struct ExtractResult {
    #[serde(default)]
    raw_content: Option<String>,
}

pub struct TavilyClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl TavilyClient {
    pub fn new(api_key: Option<String>, timeout_secs: u64) -> Self {
        Self {
            client: http_client(timeout_secs),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: TAVILY_API.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<TavilyResult>> {
        let request = SearchRequest {
            query,
            max_results,
            search_depth: "basic",
        };
        let response: SearchResponse = self.post("search", &request).await?;
        Ok(response.results)
    }

    /// Raw text of the page, if Tavily managed to extract any.
    pub async fn extract(&self, url: &str) -> Result<Option<String>> {
        let request = ExtractRequest { urls: [url] };
        let response: ExtractResponse = self.post("extract", &request).await?;
        Ok(response
            .results
            .into_iter()
            .next()
            .and_then(|r| r.raw_content))
    }

    async fn post<B, R>(&self, endpoint: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("TAVILY_API_KEY is not set"))?;

        let response = self
            .client
            .post(format!("{}/{}", self.base_url, endpoint))
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Tavily {endpoint} request failed"))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            bail!("Tavily API error {}: {}", status, error_text);
        }

        Ok(response.json().await?)
    }
}

pub struct TavilySearchTool {
    client: Arc<TavilyClient>,
    max_results: usize,
}

impl TavilySearchTool {
    pub fn new(client: Arc<TavilyClient>) -> Self {
        Self {
            client,
            max_results: 5,
        }
    }
}

#[async_trait]
impl Tool for TavilySearchTool {
    fn name(&self) -> &str {
        "Web_Search_Tavily"
    }

    fn description(&self) -> &str {
        "searches the web using Tavily. Input must be a simple keyword string. Use this as an alternative to Web_Search."
    }

    async fn invoke(&self, argument: &str) -> Result<String> {
        info!(query = %argument, "searching the web (Tavily)");
        let results = self.client.search(argument, self.max_results).await?;
        Ok(format_results(&results))
    }
}

pub struct TavilyReaderTool {
    client: Arc<TavilyClient>,
    max_chars: usize,
}

impl TavilyReaderTool {
    pub fn new(client: Arc<TavilyClient>, max_chars: usize) -> Self {
        Self { client, max_chars }
    }
}

#[async_trait]
impl Tool for TavilyReaderTool {
    fn name(&self) -> &str {
        "Content_Reader_Tavily"
    }

    fn description(&self) -> &str {
        "Reads a webpage using Tavily. Input MUST be a valid HTTP URL (e.g., https://arxiv.org/...). DO NOT use article titles. Use this as an alternative to Content_Reader."
    }

    fn input_kind(&self) -> ToolInput {
        ToolInput::Url
    }

    async fn invoke(&self, argument: &str) -> Result<String> {
        info!(url = %argument, "reading page (Tavily)");
        let content = self.client.extract(argument).await?.unwrap_or_default();
        Ok(page_excerpt(&content, self.max_chars))
    }
}

pub fn format_results(results: &[TavilyResult]) -> String {
    if results.is_empty() {
        return "No results found".to_string();
    }

    results
        .iter()
        .map(|r| format!("{}: {}", r.title, r.url))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_results_one_per_line() {
        let response: SearchResponse = serde_json::from_str(
            r#"{"query":"rust","results":[
                {"title":"Rust","url":"https://www.rust-lang.org","content":"A language","score":0.9},
                {"title":"The Book","url":"https://doc.rust-lang.org/book/","score":0.8}
            ]}"#,
        )
        .unwrap();

        assert_eq!(
            format_results(&response.results),
            "Rust: https://www.rust-lang.org\nThe Book: https://doc.rust-lang.org/book/"
        );
        assert_eq!(format_results(&[]), "No results found");
    }

    #[test]
    fn extract_response_tolerates_missing_content() {
        let response: ExtractResponse = serde_json::from_str(
            r#"{"results":[{"url":"https://example.com"}],"failed_results":[]}"#,
        )
        .unwrap();
        assert!(response.results[0].raw_content.is_none());
    }

    #[test]
    fn extract_request_shape() {
        let body = serde_json::to_value(ExtractRequest {
            urls: ["https://example.com"],
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"urls": ["https://example.com"]}));
    }

    #[tokio::test]
    async fn missing_key_fails_without_a_request() {
        let tool = TavilySearchTool::new(Arc::new(TavilyClient::new(Some(" ".into()), 1)));
        let err = tool.invoke("rust").await.unwrap_err();
        assert!(err.to_string().contains("TAVILY_API_KEY"));
    }
}
