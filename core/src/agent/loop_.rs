use crate::agent::parser::{ParseResult, ResponseParser, strip_hallucinated_observation};
use crate::agent::transcript::Step;
use crate::agent::{ContextBuilder, ToolRegistry};
use crate::config::{Config, DEFAULT_MAX_ITERATIONS, DEFAULT_OBSERVATION_CHARS, SamplingConfig};
use crate::tools::truncate_chars;
use crate::traits::{ChatRequest, Provider};
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const ITERATION_LIMIT_MESSAGE: &str = "Agent stopped due to iteration limit or time limit.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The model produced a final answer.
    Done,
    /// The iteration budget ran out first.
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct AgentRun {
    pub output: String,
    pub steps: Vec<Step>,
    pub outcome: Outcome,
}

impl AgentRun {
    pub fn intermediate_steps(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.to_string()).collect()
    }
}

/// Drives one question through think → parse → act rounds. Holds only
/// shared, immutable state, so one instance serves concurrent questions;
/// each `run` owns its transcript and budget.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    context_builder: ContextBuilder,
    tool_registry: Arc<ToolRegistry>,
    parser: ResponseParser,
    sampling: SamplingConfig,
    max_iterations: usize,
    max_observation_chars: usize,
}

impl AgentLoop {
    pub fn new(provider: Arc<dyn Provider>, tool_registry: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            context_builder: ContextBuilder::new(tool_registry.get_specs()),
            parser: ResponseParser::for_registry(&tool_registry),
            tool_registry,
            sampling: SamplingConfig::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_observation_chars: DEFAULT_OBSERVATION_CHARS,
        }
    }

    pub fn from_config(
        config: &Config,
        provider: Arc<dyn Provider>,
        tool_registry: Arc<ToolRegistry>,
    ) -> Self {
        Self::new(provider, tool_registry)
            .with_sampling(config.sampling.clone())
            .with_max_iterations(config.max_iterations)
            .with_max_observation_chars(config.max_observation_chars)
    }

    pub fn with_sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_max_observation_chars(mut self, max: usize) -> Self {
        self.max_observation_chars = max;
        self
    }

    pub async fn process(&self, question: &str) -> Result<String> {
        Ok(self.run(question).await?.output)
    }

    /// Errors only when the model call itself fails. Parse problems, tool
    /// failures and rejected arguments are all fed back to the model.
    pub async fn run(&self, question: &str) -> Result<AgentRun> {
        let mut steps: Vec<Step> = Vec::new();
        let mut budget = self.max_iterations;

        while budget > 0 {
            let iteration = self.max_iterations - budget + 1;
            let messages = self.context_builder.build_messages(question, &steps);
            let request = ChatRequest {
                messages: &messages,
                sampling: &self.sampling,
            };

            let response = self
                .provider
                .chat(request)
                .await
                .with_context(|| format!("model invocation failed ({})", self.provider.name()))?;
            let raw = response.text_or_empty();
            debug!(iteration, raw = %raw, "model turn");

            match self.parser.parse(raw) {
                ParseResult::FinalAnswer(output) => {
                    info!(iteration, steps = steps.len(), "final answer reached");
                    return Ok(AgentRun {
                        output,
                        steps,
                        outcome: Outcome::Done,
                    });
                }
                ParseResult::ToolCall(call) => {
                    info!(iteration, tool = %call.name, argument = %call.argument, "tool call");
                    let observation = self.tool_registry.execute(&call).await;
                    let observation = self.bound_observation(observation);
                    steps.push(Step {
                        log: strip_hallucinated_observation(raw.trim()).to_string(),
                        call,
                        observation,
                    });
                }
            }

            budget -= 1;
        }

        warn!(
            max_iterations = self.max_iterations,
            "iteration budget exhausted without a final answer"
        );
        Ok(AgentRun {
            output: ITERATION_LIMIT_MESSAGE.to_string(),
            steps,
            outcome: Outcome::Exhausted,
        })
    }

    fn bound_observation(&self, observation: String) -> String {
        let kept = truncate_chars(&observation, self.max_observation_chars);
        if kept.len() == observation.len() {
            observation
        } else {
            format!(
                "{}\n[... truncated at {} chars]",
                kept, self.max_observation_chars
            )
        }
    }
}
