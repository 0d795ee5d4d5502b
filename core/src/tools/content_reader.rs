use crate::tools::{CONTENT_UNREADABLE, html, http_client, truncate_chars};
use crate::traits::{Tool, ToolInput};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tracing::info;

/// Fetches a page and returns its readable text, cut to a fixed budget so a
/// single page cannot flood the prompt.
pub struct ContentReaderTool {
    client: reqwest::Client,
    max_chars: usize,
}

impl ContentReaderTool {
    pub fn new(max_chars: usize, timeout_secs: u64) -> Self {
        Self {
            client: http_client(timeout_secs),
            max_chars,
        }
    }
}

#[async_trait]
impl Tool for ContentReaderTool {
    fn name(&self) -> &str {
        "Content_Reader"
    }

    fn description(&self) -> &str {
        "Reads a webpage. Input MUST be a valid HTTP URL (e.g., https://arxiv.org/...). DO NOT use article titles."
    }

    fn input_kind(&self) -> ToolInput {
        ToolInput::Url
    }

    async fn invoke(&self, argument: &str) -> Result<String> {
        info!(url = %argument, "reading page");

        let response = self
            .client
            .get(argument)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {argument}"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("HTTP error {} for {}", status, argument);
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("html"));

        let body = response.text().await?;
        let text = if is_html { html::html_to_text(&body) } else { body };

        Ok(page_excerpt(&text, self.max_chars))
    }
}

pub(crate) fn page_excerpt(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.is_empty() {
        return CONTENT_UNREADABLE.to_string();
    }
    truncate_chars(text, max_chars).to_string()
}
