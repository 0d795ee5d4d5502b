use crate::agent::parser::ToolCall;
use crate::traits::{Tool, ToolInput, ToolSpec};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Ordered set of named tools. Built once at startup and shared read-only.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Registering a name twice replaces the earlier tool in place.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.by_name.get(&name) {
            Some(&idx) => {
                warn!(tool = %name, "replacing already registered tool");
                self.tools[idx] = tool;
            }
            None => {
                self.by_name.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.register(Arc::new(tool));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.by_name.get(name).map(|&idx| self.tools[idx].clone())
    }

    /// Names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn get_specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Runs the call and always produces an observation for the model.
    /// Unknown tools, rejected arguments and tool failures come back as
    /// text the model can react to on its next turn.
    pub async fn execute(&self, call: &ToolCall) -> String {
        let Some(tool) = self.get(&call.name) else {
            warn!(tool = %call.name, "model requested an unknown tool");
            return format!(
                "{} is not a valid tool, try one of [{}].",
                call.name,
                self.names().join(", ")
            );
        };

        let argument = match tool.input_kind() {
            ToolInput::Text => call.argument.as_str(),
            ToolInput::Url => match check_url_argument(&call.argument) {
                Ok(url) => url,
                Err(correction) => {
                    warn!(tool = %call.name, argument = %call.argument, "rejected non-URL argument");
                    return correction;
                }
            },
        };

        info!(tool = %call.name, argument = %argument, "invoking tool");
        match tool.invoke(argument).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool failed");
                format!("Tool '{}' failed: {:#}", call.name, e)
            }
        }
    }
}

/// Accepts arguments that look like a link. Models tend to pass the paper
/// title they just saw instead of its `link` field.
pub fn check_url_argument(argument: &str) -> Result<&str, String> {
    let url = argument.trim().trim_matches('"').trim_matches('\'');

    if url.starts_with("http") {
        Ok(url)
    } else {
        Err(format!(
            "ERROR: You provided a TITLE ('{url}'), but I need a valid URL starting with 'http'. \
             Please check the 'link' field in the previous search results and copy that URL exactly."
        ))
    }
}
