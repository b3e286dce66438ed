use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::error::ToolInvokeError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerToolInfo {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: Option<Value>,
}

/// Narrow view of the tool servers that the agent talks to.
#[async_trait]
pub trait ToolServerInterface: Send + Sync {
    /// Configured server names, in configuration order.
    fn server_names(&self) -> Vec<String>;

    /// Starts the server if needed and returns its tool catalogue.
    async fn list_tools(&self, server: &str) -> Result<Vec<ServerToolInfo>, ToolInvokeError>;

    async fn invoke_tool(
        &self,
        server: &str,
        tool: &str,
        arguments: Value,
    ) -> Result<Value, ToolInvokeError>;

    async fn server_instructions(&self, server: &str) -> Option<String>;

    /// Tears down every running connection. Later calls fail with `ShutDown`.
    async fn shutdown(&self);
}
