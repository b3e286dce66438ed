mod discovery;
mod execution;
mod instructions;
mod parser;

use std::sync::Arc;

pub(super) use super::context::{ServerGuidance, ToolContext, ToolDescriptor};
pub(super) use super::directive::AgentDirective;
pub(super) use super::errors::{AgentError, ToolError};
pub(super) use crate::application::tooling::{ToolInvokeError, ToolServerInterface};
pub(super) use execution::ToolExecution;
pub(super) use serde_json::{Value, json};

/// Bridges the agent loop to the tool servers.
pub struct ToolRuntime {
    bridge: Arc<dyn ToolServerInterface>,
}

impl ToolRuntime {
    pub fn new(bridge: Arc<dyn ToolServerInterface>) -> Self {
        Self { bridge }
    }

    pub async fn shutdown(&self) {
        self.bridge.shutdown().await;
    }
}
