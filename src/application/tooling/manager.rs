use super::error::ToolInvokeError;
use super::event_stream::EventStreamConnection;
use super::interface::{ServerToolInfo, ToolServerInterface};
use super::process::{McpProcess, ProcessSpec};
use crate::config::{Configuration, ServerDescriptor};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

#[derive(Clone)]
enum Connection {
    Process(McpProcess),
    EventStream(EventStreamConnection),
}

impl Connection {
    fn from_descriptor(name: &str, descriptor: &ServerDescriptor) -> Self {
        match descriptor {
            ServerDescriptor::Process { command, args, env } => {
                Connection::Process(McpProcess::new(ProcessSpec {
                    name: name.to_string(),
                    command: command.clone(),
                    args: args.clone(),
                    env: env.clone(),
                }))
            }
            ServerDescriptor::EventStream { url, .. } => {
                Connection::EventStream(EventStreamConnection::new(name, url.clone()))
            }
        }
    }

    async fn ensure_running(&self) -> Result<(), ToolInvokeError> {
        match self {
            Connection::Process(process) => process.ensure_running().await,
            Connection::EventStream(stream) => stream.ensure_running().await,
        }
    }

    async fn list_tools(&self) -> Result<Vec<ServerToolInfo>, ToolInvokeError> {
        match self {
            Connection::Process(process) => process.list_tools().await,
            Connection::EventStream(stream) => stream.list_tools().await,
        }
    }

    async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value, ToolInvokeError> {
        match self {
            Connection::Process(process) => process.call_tool(tool, arguments).await,
            Connection::EventStream(stream) => stream.call_tool(tool, arguments).await,
        }
    }

    async fn instructions(&self) -> Option<String> {
        match self {
            Connection::Process(process) => process.instructions().await,
            Connection::EventStream(stream) => stream.instructions().await,
        }
    }

    async fn shutdown(&self) {
        match self {
            Connection::Process(process) => process.shutdown().await,
            Connection::EventStream(stream) => stream.shutdown().await,
        }
    }
}

/// Tool client bound to one [`Configuration`].
///
/// Connections are created and started lazily on first use and live until
/// [`ToolServerInterface::shutdown`].
pub struct ServerManager {
    configuration: Configuration,
    instances: Mutex<HashMap<String, Connection>>,
    shut_down: AtomicBool,
}

impl ServerManager {
    pub fn new(configuration: Configuration) -> Self {
        Self {
            configuration,
            instances: Mutex::new(HashMap::new()),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    async fn ensure_connection(&self, server: &str) -> Result<Connection, ToolInvokeError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(ToolInvokeError::ShutDown {
                server: server.to_string(),
            });
        }

        let connection = {
            let mut instances = self
                .instances
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match instances.get(server) {
                Some(existing) => existing.clone(),
                None => {
                    let descriptor = self.configuration.get(server).ok_or_else(|| {
                        ToolInvokeError::NotConfigured {
                            server: server.to_string(),
                        }
                    })?;
                    let connection = Connection::from_descriptor(server, descriptor);
                    instances.insert(server.to_string(), connection.clone());
                    connection
                }
            }
        };

        connection.ensure_running().await?;
        Ok(connection)
    }
}

#[async_trait]
impl ToolServerInterface for ServerManager {
    fn server_names(&self) -> Vec<String> {
        self.configuration
            .names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    async fn list_tools(&self, server: &str) -> Result<Vec<ServerToolInfo>, ToolInvokeError> {
        let connection = self.ensure_connection(server).await?;
        connection.list_tools().await
    }

    async fn invoke_tool(
        &self,
        server: &str,
        tool: &str,
        arguments: Value,
    ) -> Result<Value, ToolInvokeError> {
        let connection = self.ensure_connection(server).await?;
        connection.call_tool(tool, arguments).await
    }

    async fn server_instructions(&self, server: &str) -> Option<String> {
        match self.ensure_connection(server).await {
            Ok(connection) => connection.instructions().await,
            Err(err) => {
                warn!(server, %err, "Failed to fetch server instructions");
                None
            }
        }
    }

    async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);
        let connections: Vec<(String, Connection)> = {
            let mut instances = self
                .instances
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            instances.drain().collect()
        };
        for (name, connection) in connections {
            connection.shutdown().await;
            info!(server = %name, "Tool server connection released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configuration() -> Configuration {
        Configuration::new()
            .with_server(
                "broken",
                ServerDescriptor::process("definitely-not-a-real-binary-4f1c", ["--flag"]),
            )
            .with_server("graphiti", ServerDescriptor::event_stream("not a url"))
    }

    #[test]
    fn reports_names_in_configuration_order() {
        let manager = ServerManager::new(configuration());
        assert_eq!(manager.server_names(), vec!["broken", "graphiti"]);
    }

    #[tokio::test]
    async fn unknown_server_is_not_configured() {
        let manager = ServerManager::new(configuration());
        let err = manager
            .invoke_tool("missing", "anything", Value::Null)
            .await
            .expect_err("unknown server");
        assert!(matches!(err, ToolInvokeError::NotConfigured { .. }));
    }

    #[tokio::test]
    async fn start_failures_surface_per_server() {
        let manager = ServerManager::new(configuration());
        let err = manager.list_tools("broken").await.expect_err("spawn fails");
        assert!(matches!(err, ToolInvokeError::Spawn { .. }));
        let err = manager.list_tools("graphiti").await.expect_err("connect fails");
        assert!(matches!(err, ToolInvokeError::Connect { .. }));
    }

    #[tokio::test]
    async fn calls_after_shutdown_are_rejected() {
        let manager = ServerManager::new(configuration());
        manager.shutdown().await;
        let err = manager.list_tools("broken").await.expect_err("shut down");
        assert!(matches!(err, ToolInvokeError::ShutDown { .. }));
    }
}
