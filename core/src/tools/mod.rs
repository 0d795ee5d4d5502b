use crate::agent::ToolRegistry;
use crate::config::ToolsConfig;
use std::sync::Arc;
use std::time::Duration;

pub mod arxiv;
pub mod content_reader;
pub mod duckduckgo;
pub mod html;
pub mod tavily;

pub use arxiv::{ArxivSearchTool, Paper};
pub use content_reader::ContentReaderTool;
pub use duckduckgo::WebSearchTool;
pub use tavily::{TavilyClient, TavilyReaderTool, TavilySearchTool};

pub const CONTENT_UNREADABLE: &str = "Content could not be read";

const USER_AGENT: &str = "Mozilla/5.0 (compatible; ZephyrResearchAgent/0.1)";

/// The research tool set. More specific names are registered before the
/// names they contain so action-line matching picks the right one.
pub fn research_registry(config: &ToolsConfig) -> ToolRegistry {
    let tavily = Arc::new(TavilyClient::new(
        config.tavily_api_key.clone(),
        config.request_timeout_secs,
    ));

    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ArxivSearchTool::new(
        config.arxiv_max_results,
        config.request_timeout_secs,
    )));
    registry.register(Arc::new(TavilySearchTool::new(tavily.clone())));
    registry.register(Arc::new(WebSearchTool::new(config.request_timeout_secs)));
    registry.register(Arc::new(TavilyReaderTool::new(
        tavily,
        config.content_max_chars,
    )));
    registry.register(Arc::new(ContentReaderTool::new(
        config.content_max_chars,
        config.request_timeout_secs,
    )));
    registry
}

pub(crate) fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(timeout_secs.min(30)))
        .build()
        .unwrap_or_default()
}

/// Longest prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
