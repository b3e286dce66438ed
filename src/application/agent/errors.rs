use crate::application::tooling::ToolInvokeError;
use crate::model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("invalid agent response: {0}")]
    InvalidResponse(String),
    #[error("agent exceeded the maximum of {max_steps} tool interactions")]
    StepLimitExceeded { max_steps: usize },
}

impl AgentError {
    pub fn user_message(&self) -> String {
        match self {
            AgentError::Model(err) => err.user_message(),
            AgentError::InvalidResponse(_) => {
                "The model gave a response that could not be understood. Please rephrase your request."
                    .to_string()
            }
            AgentError::StepLimitExceeded { max_steps } => format!(
                "The agent stopped after {max_steps} tool calls without reaching an answer."
            ),
        }
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool requested: {0}")]
    UnknownTool(String),
    #[error("failed to execute tool '{tool}': {source}")]
    Execution {
        tool: String,
        #[source]
        source: ToolInvokeError,
    },
}

impl ToolError {
    pub fn user_message(&self) -> String {
        match self {
            ToolError::UnknownTool(name) => {
                format!("Tool \"{name}\" is not offered by any active server.")
            }
            ToolError::Execution { tool, source } => {
                format!("Running tool \"{tool}\" failed: {source}")
            }
        }
    }
}
