use crate::application::agent::AgentError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("configuration defines no tool servers")]
    EmptyConfiguration,
    #[error("failed to create agent: {0}")]
    Agent(#[from] AgentError),
}

impl ActivationError {
    pub fn user_message(&self) -> String {
        match self {
            ActivationError::EmptyConfiguration => {
                "Failed to load configuration: no tool servers are defined.".to_string()
            }
            ActivationError::Agent(err) => format!("Failed to create agent: {}", err.user_message()),
        }
    }
}
