pub mod context;
pub mod loop_;
pub mod parser;
pub mod registry;
pub mod transcript;

#[cfg(test)]
pub(crate) mod testing;

pub use context::ContextBuilder;
pub use loop_::{AgentLoop, AgentRun, ITERATION_LIMIT_MESSAGE, Outcome};
pub use parser::{ParseResult, ResponseParser, ToolCall};
pub use registry::ToolRegistry;
pub use transcript::Step;
