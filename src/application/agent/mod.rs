mod context;
mod directive;
mod errors;
mod factory;
mod models;
mod runner;
mod runtime;


pub use context::{ServerGuidance, ToolContext, ToolDescriptor};
pub use errors::{AgentError, ToolError};
pub use factory::{AgentFactory, OpenAIAgentFactory, QueryAgent};
pub use models::{AgentOptions, AgentOutcome, AgentStep};
pub use runner::Agent;
