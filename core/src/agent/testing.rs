//! In-memory providers and tools for exercising the loop without a network.

use crate::traits::{ChatMessage, ChatRequest, ChatResponse, Provider, Tool, ToolInput};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Replies with the scripted turns in order, repeating the last one forever.
pub struct ScriptedProvider {
    turns: Mutex<VecDeque<String>>,
    last: Mutex<String>,
    prompts: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(turns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            turns: Mutex::new(turns.into_iter().map(Into::into).collect()),
            last: Mutex::new(String::new()),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn prompts(&self) -> Arc<Mutex<Vec<Vec<ChatMessage>>>> {
        self.prompts.clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(&self, request: ChatRequest<'_>) -> anyhow::Result<ChatResponse> {
        self.prompts.lock().unwrap().push(request.messages.to_vec());

        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.turns.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok(ChatResponse::text(last.clone()))
    }
}

pub struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    async fn chat(&self, _request: ChatRequest<'_>) -> anyhow::Result<ChatResponse> {
        Err(anyhow::anyhow!("401 Unauthorized"))
    }
}

/// Answers `"{name}: {argument}"` and records every argument it receives.
pub struct EchoTool {
    name: String,
    input: ToolInput,
    calls: Arc<Mutex<Vec<String>>>,
}

impl EchoTool {
    pub fn text(name: &str) -> Self {
        Self::with_input(name, ToolInput::Text)
    }

    pub fn url(name: &str) -> Self {
        Self::with_input(name, ToolInput::Url)
    }

    fn with_input(name: &str, input: ToolInput) -> Self {
        Self {
            name: name.to_string(),
            input,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        self.calls.clone()
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "echoes its argument"
    }

    fn input_kind(&self) -> ToolInput {
        self.input
    }

    async fn invoke(&self, argument: &str) -> anyhow::Result<String> {
        self.calls.lock().unwrap().push(argument.to_string());
        Ok(format!("{}: {}", self.name, argument))
    }
}

pub struct FailingTool {
    name: String,
}

impl FailingTool {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "always fails"
    }

    async fn invoke(&self, _argument: &str) -> anyhow::Result<String> {
        Err(anyhow::anyhow!("upstream unavailable"))
    }
}
