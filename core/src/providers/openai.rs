use crate::config::SamplingConfig;
use crate::providers::trim_at_stop_sequences;
use crate::traits::{ChatMessage, ChatRequest, ChatResponse, Provider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The chat completions endpoint rejects more than four stop sequences.
const MAX_STOP_SEQUENCES: usize = 4;

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    temperature: f64,
    top_p: f64,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<&'a [String]>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

/// Any OpenAI-compatible chat completions server.
pub struct OpenAIProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAIProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key: api_key.into(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn convert_messages<'a>(&self, messages: &'a [ChatMessage]) -> Vec<OpenAIMessage<'a>> {
        messages
            .iter()
            .map(|m| OpenAIMessage {
                role: &m.role,
                content: &m.content,
            })
            .collect()
    }

    fn build_request<'a>(&'a self, request: &ChatRequest<'a>) -> OpenAIRequest<'a> {
        let sampling: &'a SamplingConfig = request.sampling;
        let stop = &sampling.stop;
        OpenAIRequest {
            model: &self.model,
            messages: self.convert_messages(request.messages),
            temperature: sampling.temperature,
            top_p: sampling.top_p,
            max_tokens: sampling.max_new_tokens,
            stop: (!stop.is_empty()).then(|| &stop[..stop.len().min(MAX_STOP_SEQUENCES)]),
        }
    }
}

#[async_trait]
impl Provider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<ChatResponse> {
        let openai_request = self.build_request(&request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&openai_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "OpenAI API error {}: {}",
                status,
                error_text
            ));
        }

        let openai_response: OpenAIResponse = response.json().await?;

        let choice = openai_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No choices in response"))?;

        // The server only honours the first four stops; the rest are applied here.
        Ok(ChatResponse {
            text: choice
                .message
                .content
                .map(|c| trim_at_stop_sequences(&c, &request.sampling.stop)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_caps_stop_sequences() {
        let provider = OpenAIProvider::new("sk-test").with_model("gpt-4o-mini");
        let sampling = SamplingConfig::default();
        let messages = [ChatMessage::system("sys"), ChatMessage::user("Question: q")];
        let request = ChatRequest {
            messages: &messages,
            sampling: &sampling,
        };

        let json = serde_json::to_value(provider.build_request(&request)).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["max_tokens"], 512);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Question: q");
        assert_eq!(json["stop"].as_array().unwrap().len(), MAX_STOP_SEQUENCES);
    }

    #[test]
    fn empty_stop_list_is_omitted() {
        let provider = OpenAIProvider::new("sk-test");
        let sampling = SamplingConfig {
            stop: Vec::new(),
            ..SamplingConfig::default()
        };
        let request = ChatRequest {
            messages: &[],
            sampling: &sampling,
        };

        let json = serde_json::to_value(provider.build_request(&request)).unwrap();
        assert!(json.get("stop").is_none());
    }

    #[test]
    fn base_url_trailing_slash_is_dropped() {
        let provider = OpenAIProvider::new("k").with_base_url("http://localhost:8080/v1/");
        assert_eq!(provider.base_url, "http://localhost:8080/v1");
    }
}
