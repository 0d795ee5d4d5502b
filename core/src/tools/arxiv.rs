//! Academic search backed by the arXiv Atom API.

use crate::tools::{html, http_client};
use crate::traits::Tool;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

const ARXIV_API: &str = "http://export.arxiv.org/api/query";
const MAX_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub published: String,
}

pub struct ArxivSearchTool {
    client: reqwest::Client,
    base_url: String,
    max_results: usize,
    retry_delay: Duration,
}

impl ArxivSearchTool {
    pub fn new(max_results: usize, timeout_secs: u64) -> Self {
        Self {
            client: http_client(timeout_secs),
            base_url: ARXIV_API.to_string(),
            max_results,
            retry_delay: Duration::from_secs(3),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Papers ordered by relevance. The arXiv API throttles aggressively, so
    /// failed requests are retried a few times with a pause in between.
    pub async fn search(&self, query: &str) -> Result<Vec<Paper>> {
        let mut last_error = None;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.fetch_feed(query).await {
                Ok(feed) => return Ok(parse_atom_feed(&feed)),
                Err(e) => {
                    warn!(attempt, error = %e, "arXiv request failed");
                    last_error = Some(e);
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("arXiv request failed")))
    }

    async fn fetch_feed(&self, query: &str) -> Result<String> {
        let url = format!(
            "{}?search_query={}&start=0&max_results={}&sortBy=relevance&sortOrder=descending",
            self.base_url,
            urlencoding::encode(&format!("all:{query}")),
            self.max_results
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("arXiv request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("arXiv API error {}", status);
        }

        response.text().await.context("Failed to read arXiv response")
    }
}

#[async_trait]
impl Tool for ArxivSearchTool {
    fn name(&self) -> &str {
        "Academic_Search"
    }

    fn description(&self) -> &str {
        "searches ArXiv. Returns a list of papers with 'title' and 'link'. Use the 'link' for reading."
    }

    async fn invoke(&self, argument: &str) -> Result<String> {
        info!(query = %argument, "searching arXiv");

        let papers = match self.search(argument).await {
            Ok(papers) => papers,
            Err(e) => vec![Paper {
                title: "ArXiv Access Error".to_string(),
                link: String::new(),
                summary: format!(
                    "An error occurred: {e:#}. Please wait a second and try again"
                ),
                published: String::new(),
            }],
        };

        if papers.is_empty() {
            return Ok(format!("No papers found on arXiv for '{argument}'."));
        }

        Ok(serde_json::to_string(&papers)?)
    }
}

pub fn parse_atom_feed(xml: &str) -> Vec<Paper> {
    let mut papers = Vec::new();

    for entry in xml.split("<entry>").skip(1) {
        let Some(end) = entry.find("</entry>") else {
            continue;
        };
        let entry = &entry[..end];

        let Some(title) = extract_xml_content(entry, "title") else {
            continue;
        };

        let link = pdf_link(entry)
            .or_else(|| extract_xml_content(entry, "id").map(|id| id.replace("/abs/", "/pdf/")))
            .unwrap_or_default();

        let published = extract_xml_content(entry, "published")
            .map(|raw| {
                chrono::DateTime::parse_from_rfc3339(raw.trim())
                    .map(|date| date.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|_| raw.trim().chars().take(10).collect())
            })
            .unwrap_or_default();

        papers.push(Paper {
            title: collapse_whitespace(&title),
            link: link.trim().to_string(),
            summary: extract_xml_content(entry, "summary")
                .map(|s| collapse_whitespace(&s))
                .unwrap_or_default(),
            published,
        });
    }

    papers
}

fn extract_xml_content(xml: &str, tag: &str) -> Option<String> {
    let start_tag = format!("<{}", tag);
    let end_tag = format!("</{}>", tag);

    let start = xml.find(&start_tag)?;
    let after_start = &xml[start..];
    let content_start = after_start.find('>')?;
    let content = &after_start[content_start + 1..];
    let end = content.find(&end_tag)?;
    Some(html::decode_entities(&content[..end]))
}

fn pdf_link(entry: &str) -> Option<String> {
    entry
        .split("<link")
        .skip(1)
        .map(|tag| tag.split('>').next().unwrap_or_default())
        .find(|tag| tag.contains("title=\"pdf\""))
        .and_then(|tag| attribute(tag, "href"))
}

fn attribute(tag: &str, name: &str) -> Option<String> {
    let needle = format!("{name}=\"");
    let start = tag.find(&needle)? + needle.len();
    let len = tag[start..].find('"')?;
    Some(tag[start..start + len].to_string())
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
