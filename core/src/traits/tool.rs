use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What kind of argument a tool expects from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolInput {
    Text,
    /// A resource locator; anything not starting with `http` is turned
    /// back to the model before the tool runs.
    Url,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input: ToolInput,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn input_kind(&self) -> ToolInput {
        ToolInput::Text
    }

    async fn invoke(&self, argument: &str) -> anyhow::Result<String>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input: self.input_kind(),
        }
    }
}
