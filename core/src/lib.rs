pub mod agent;
pub mod config;
pub mod providers;
pub mod server;
pub mod tools;
pub mod traits;

pub use agent::{AgentLoop, AgentRun, ContextBuilder, Outcome, ParseResult, ResponseParser, ToolRegistry};
pub use config::*;
pub use providers::*;
pub use tools::*;
pub use traits::*;
