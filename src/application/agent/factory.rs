//! Seams between the session controller and a concrete agent.

use super::errors::AgentError;
use super::models::{AgentOptions, AgentOutcome};
use super::runner::Agent;
use crate::application::tooling::{ServerManager, ToolServerInterface};
use crate::config::builder::OPENAI_API_KEY;
use crate::config::{AppSettings, Configuration, EnvSource, ProcessEnv, ensure_env_loaded};
use crate::model::{ModelProvider, OpenAIClient};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// A live agent as seen by a session.
#[async_trait]
pub trait QueryAgent: Send + Sync {
    async fn run(&self, query: &str) -> Result<AgentOutcome, AgentError>;

    async fn shutdown(&self);
}

#[async_trait]
impl<P: ModelProvider> QueryAgent for Agent<P> {
    async fn run(&self, query: &str) -> Result<AgentOutcome, AgentError> {
        Agent::run(self, query).await
    }

    async fn shutdown(&self) {
        Agent::shutdown(self).await;
    }
}

/// Builds an agent bound to one configuration.
#[async_trait]
pub trait AgentFactory: Send + Sync {
    async fn build(&self, configuration: Configuration) -> Result<Box<dyn QueryAgent>, AgentError>;
}

/// Production factory: MCP servers from the configuration plus an
/// OpenAI-compatible chat model.
pub struct OpenAIAgentFactory {
    settings: AppSettings,
    env: Arc<dyn EnvSource + Send + Sync>,
}

impl OpenAIAgentFactory {
    pub fn new(settings: AppSettings) -> Self {
        Self::with_env(settings, Arc::new(ProcessEnv))
    }

    pub fn with_env(settings: AppSettings, env: Arc<dyn EnvSource + Send + Sync>) -> Self {
        Self { settings, env }
    }
}

#[async_trait]
impl AgentFactory for OpenAIAgentFactory {
    async fn build(&self, configuration: Configuration) -> Result<Box<dyn QueryAgent>, AgentError> {
        ensure_env_loaded();
        let provider = OpenAIClient::new(
            self.settings.model_endpoint.clone(),
            self.env.var(OPENAI_API_KEY),
        )?;

        let servers = configuration.len();
        let bridge: Arc<dyn ToolServerInterface> = Arc::new(ServerManager::new(configuration));
        let options =
            AgentOptions::new(self.settings.model.clone()).with_max_steps(self.settings.max_steps);
        info!(
            model = %options.model,
            max_steps = options.max_steps,
            servers,
            "Agent built"
        );
        Ok(Box::new(Agent::new(provider, bridge, options)))
    }
}
