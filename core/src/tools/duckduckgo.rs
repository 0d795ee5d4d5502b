//! General web search through DuckDuckGo's HTML endpoint (no API key).

use crate::tools::{html, http_client};
use crate::traits::Tool;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tracing::info;

const DUCKDUCKGO_HTML: &str = "https://html.duckduckgo.com/html/";
const NO_RESULTS: &str = "No good DuckDuckGo Search Result was found";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

pub struct WebSearchTool {
    client: reqwest::Client,
    base_url: String,
    max_results: usize,
}

impl WebSearchTool {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            client: http_client(timeout_secs),
            base_url: DUCKDUCKGO_HTML.to_string(),
            max_results: 5,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "Web_Search"
    }

    fn description(&self) -> &str {
        "searches the web. Input must be a simple keyword string."
    }

    async fn invoke(&self, argument: &str) -> Result<String> {
        info!(query = %argument, "searching the web");

        let url = format!("{}?q={}", self.base_url, urlencoding::encode(argument));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("DuckDuckGo request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("DuckDuckGo error {}", status);
        }

        let body = response.text().await?;
        Ok(format_hits(&parse_results(&body, self.max_results)))
    }
}

pub fn format_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return NO_RESULTS.to_string();
    }

    hits.iter()
        .map(|hit| format!("{}\n{}\nURL: {}", hit.title, hit.snippet, hit.url))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn parse_results(page: &str, max_results: usize) -> Vec<SearchHit> {
    let mut hits = Vec::new();

    // The class sits inside a longer list ("links_main links_deep result__body").
    for chunk in page.split("result__body\"").skip(1) {
        if hits.len() >= max_results {
            break;
        }

        let Some(anchor) = chunk.split("class=\"result__a\"").nth(1) else {
            continue;
        };

        let title = anchor
            .split_once('>')
            .and_then(|(_, s)| s.split("</a").next())
            .map(html::html_to_text)
            .unwrap_or_default();

        let href = anchor
            .split("href=\"")
            .nth(1)
            .and_then(|s| s.split('"').next())
            .map(resolve_redirect)
            .unwrap_or_default();

        let snippet = chunk
            .split("class=\"result__snippet\"")
            .nth(1)
            .and_then(|s| s.split_once('>'))
            .and_then(|(_, s)| s.split("</a").next())
            .map(|s| html::html_to_text(s).replace('\n', " "))
            .unwrap_or_default();

        if !title.is_empty() && href.starts_with("http") {
            hits.push(SearchHit {
                title,
                url: href,
                snippet,
            });
        }
    }

    hits
}

/// Result links go through `//duckduckgo.com/l/?uddg=<encoded target>`.
fn resolve_redirect(href: &str) -> String {
    let href = html::decode_entities(href);
    if let Some((_, rest)) = href.split_once("uddg=") {
        let encoded = rest.split('&').next().unwrap_or_default();
        if let Ok(target) = urlencoding::decode(encoded) {
            return target.into_owned();
        }
    }
    href
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<div class="result results_links">
  <div class="links_main links_deep result__body">
    <h2 class="result__title">
      <a rel="nofollow" class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fdoc.rust-lang.org%2Fbook%2F&amp;rut=abc">The Rust <b>Programming</b> Language</a>
    </h2>
    <a class="result__snippet" href="//duckduckgo.com/l/?uddg=x">Learn <b>Rust</b> &amp; ownership.</a>
  </div>
</div>
<div class="result results_links">
  <div class="links_main links_deep result__body">
    <h2 class="result__title">
      <a rel="nofollow" class="result__a" href="https://www.rust-lang.org/">Rust</a>
    </h2>
  </div>
</div>
<div class="result results_links">
  <div class="links_main links_deep result__body">
    <a class="result__a" href="/relative">Ignored</a>
  </div>
</div>"#;

    #[test]
    fn parses_titles_links_and_snippets() {
        let hits = parse_results(PAGE, 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(
            hits[0],
            SearchHit {
                title: "The Rust Programming Language".to_string(),
                url: "https://doc.rust-lang.org/book/".to_string(),
                snippet: "Learn Rust & ownership.".to_string(),
            }
        );
        assert_eq!(hits[1].url, "https://www.rust-lang.org/");
        assert_eq!(hits[1].snippet, "");
    }

    #[test]
    fn result_body_inside_class_list() {
        let page = r#"<div class="links_main links_deep result__body"><h2 class="result__title"><a class="result__a" href="https://www.rust-lang.org/">Rust</a></h2></div>"#;
        let hits = parse_results(page, 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Rust");
        assert_eq!(hits[0].url, "https://www.rust-lang.org/");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        let tool = WebSearchTool::new(1).with_base_url("http://127.0.0.1:9/html/");
        let err = tool.invoke("rust").await.unwrap_err();
        assert!(err.to_string().contains("DuckDuckGo request failed"));
    }

    #[test]
    fn respects_max_results() {
        assert_eq!(parse_results(PAGE, 1).len(), 1);
    }

    #[test]
    fn empty_results_message() {
        assert_eq!(format_hits(&[]), NO_RESULTS);
        let formatted = format_hits(&parse_results(PAGE, 1));
        assert_eq!(
            formatted,
            "The Rust Programming Language\nLearn Rust & ownership.\nURL: https://doc.rust-lang.org/book/"
        );
    }
}
