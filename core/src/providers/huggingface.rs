use crate::providers::trim_at_stop_sequences;
use crate::traits::{ChatMessage, ChatRequest, ChatResponse, Provider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const HF_INFERENCE_URL: &str = "https://router.huggingface.co/hf-inference";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    inputs: String,
    parameters: GenerateParameters<'a>,
}

#[derive(Debug, Serialize)]
struct GenerateParameters<'a> {
    temperature: f64,
    top_k: u32,
    top_p: f64,
    repetition_penalty: f64,
    max_new_tokens: u32,
    stop: &'a [String],
    do_sample: bool,
    return_full_text: bool,
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GenerateResponse {
    Batch(Vec<GeneratedText>),
    Single(GeneratedText),
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Text generation against a Hugging Face hosted instruct model.
pub struct HuggingFaceProvider {
    client: reqwest::Client,
    api_token: String,
    repo_id: String,
    base_url: String,
}

impl HuggingFaceProvider {
    pub fn new(api_token: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_token: api_token.into(),
            repo_id: crate::config::DEFAULT_MODEL.to_string(),
            base_url: HF_INFERENCE_URL.to_string(),
        }
    }

    pub fn with_model(mut self, repo_id: impl Into<String>) -> Self {
        self.repo_id = repo_id.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Provider for HuggingFaceProvider {
    fn name(&self) -> &str {
        "huggingface"
    }

    async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<ChatResponse> {
        let sampling = request.sampling;
        let body = GenerateRequest {
            inputs: render_mistral_prompt(request.messages),
            parameters: GenerateParameters {
                temperature: sampling.temperature,
                top_k: sampling.top_k,
                top_p: sampling.top_p,
                repetition_penalty: sampling.repetition_penalty,
                max_new_tokens: sampling.max_new_tokens,
                stop: &sampling.stop,
                do_sample: true,
                return_full_text: false,
            },
        };

        let response = self
            .client
            .post(format!("{}/models/{}", self.base_url, self.repo_id))
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| e.error)
                .unwrap_or(error_text);
            return Err(anyhow::anyhow!(
                "Hugging Face API error {}: {}",
                status,
                detail
            ));
        }

        let generated = match response.json::<GenerateResponse>().await? {
            GenerateResponse::Batch(mut batch) if !batch.is_empty() => {
                batch.swap_remove(0).generated_text
            }
            GenerateResponse::Batch(_) => {
                return Err(anyhow::anyhow!("Empty response from Hugging Face API"));
            }
            GenerateResponse::Single(single) => single.generated_text,
        };

        Ok(ChatResponse::text(trim_at_stop_sequences(
            &generated,
            &sampling.stop,
        )))
    }
}

/// Mistral instruct models have no system role; the system text is folded
/// into the first user instruction.
pub fn render_mistral_prompt(messages: &[ChatMessage]) -> String {
    let mut prompt = String::from("<s>");
    let mut pending_system: Option<&str> = None;

    for message in messages {
        match message.role.as_str() {
            "system" => pending_system = Some(&message.content),
            "assistant" => {
                prompt.push_str(&message.content);
                prompt.push_str("</s>");
            }
            _ => {
                prompt.push_str("[INST] ");
                if let Some(system) = pending_system.take() {
                    prompt.push_str(system);
                    prompt.push_str("\n\n");
                }
                prompt.push_str(&message.content);
                prompt.push_str(" [/INST]");
            }
        }
    }

    if let Some(system) = pending_system {
        prompt.push_str("[INST] ");
        prompt.push_str(system);
        prompt.push_str(" [/INST]");
    }

    prompt
}
