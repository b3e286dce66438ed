use super::error::ToolInvokeError;
use super::interface::ServerToolInfo;
use super::rpc::{RpcChannel, RpcState};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

/// Launch parameters for a server spoken to over its stdin/stdout.
#[derive(Debug, Clone)]
pub(super) struct ProcessSpec {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
}

#[derive(Clone)]
pub(super) struct McpProcess {
    inner: Arc<ProcessInner>,
}

struct ProcessInner {
    spec: ProcessSpec,
    rpc: RpcState,
    startup: AsyncMutex<()>,
    child: AsyncMutex<Option<Child>>,
    writer: AsyncMutex<Option<BufWriter<ChildStdin>>>,
}

impl McpProcess {
    pub(super) fn new(spec: ProcessSpec) -> Self {
        Self {
            inner: Arc::new(ProcessInner {
                rpc: RpcState::new(spec.name.clone()),
                spec,
                startup: AsyncMutex::new(()),
                child: AsyncMutex::new(None),
                writer: AsyncMutex::new(None),
            }),
        }
    }

    pub(super) async fn ensure_running(&self) -> Result<(), ToolInvokeError> {
        self.inner.ensure_running().await
    }

    pub(super) async fn list_tools(&self) -> Result<Vec<ServerToolInfo>, ToolInvokeError> {
        self.ensure_running().await?;
        self.inner.cached_tools().await
    }

    pub(super) async fn call_tool(
        &self,
        tool: &str,
        arguments: Value,
    ) -> Result<Value, ToolInvokeError> {
        self.ensure_running().await?;
        self.inner.call_tool(tool, arguments).await
    }

    pub(super) async fn instructions(&self) -> Option<String> {
        self.inner.rpc.instructions().await
    }

    pub(super) async fn shutdown(&self) {
        self.inner.reset().await;
    }
}

impl ProcessInner {
    async fn ensure_running(self: &Arc<Self>) -> Result<(), ToolInvokeError> {
        let _startup = self.startup.lock().await;
        if self.child.lock().await.is_some() {
            return Ok(());
        }

        let mut command = Command::new(&self.spec.command);
        command
            .args(&self.spec.args)
            .envs(&self.spec.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| ToolInvokeError::Spawn {
            server: self.spec.name.clone(),
            source,
        })?;
        info!(server = %self.spec.name, command = %self.spec.command, "Spawned MCP server process");

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| self.rpc.transport_error("failed to capture server stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| self.rpc.transport_error("failed to capture server stdout"))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(self.spec.name.clone(), stderr));
        }

        *self.writer.lock().await = Some(BufWriter::new(stdin));
        *self.child.lock().await = Some(child);

        let reader_self = Arc::clone(self);
        tokio::spawn(async move {
            reader_self.reader_loop(stdout).await;
        });

        if let Err(err) = self.initialize_sequence().await {
            warn!(server = %self.spec.name, %err, "MCP handshake failed");
            self.reset().await;
            return Err(err);
        }
        Ok(())
    }

    async fn reader_loop(self: Arc<Self>, stdout: ChildStdout) {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(raw)) = lines.next_line().await {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                continue;
            }
            if !trimmed.starts_with('{') {
                debug!(server = %self.spec.name, line = trimmed, "skipping non-JSON line from MCP server");
                continue;
            }
            match serde_json::from_str::<Value>(trimmed) {
                Ok(value) => {
                    if let Err(err) = self.process_inbound_message(value).await {
                        warn!(server = %self.spec.name, %err, "failed to process message from MCP server");
                    }
                }
                Err(source) => {
                    warn!(server = %self.spec.name, line = trimmed, %source, "received invalid JSON from MCP server");
                }
            }
        }

        debug!(server = %self.spec.name, "MCP server stdout closed");
        self.reset().await;
    }

    async fn reset(&self) {
        self.writer.lock().await.take();

        if let Some(mut child) = self.child.lock().await.take() {
            if let Err(err) = child.kill().await {
                debug!(server = %self.spec.name, %err, "failed to kill MCP server process (may have already exited)");
            }
            let _ = child.wait().await;
            info!(server = %self.spec.name, "MCP server process stopped");
        }

        self.rpc
            .clear(|server| ToolInvokeError::Terminated {
                server: server.to_string(),
            })
            .await;
    }
}

#[async_trait]
impl RpcChannel for ProcessInner {
    fn rpc(&self) -> &RpcState {
        &self.rpc
    }

    async fn write_message(&self, message: &Value) -> Result<(), ToolInvokeError> {
        let mut encoded =
            serde_json::to_string(message).map_err(|source| ToolInvokeError::InvalidJson {
                server: self.spec.name.clone(),
                source,
            })?;
        encoded.push('\n');

        let mut writer = self.writer.lock().await;
        let stream = writer
            .as_mut()
            .ok_or_else(|| self.rpc.transport_error("writer not initialised"))?;
        stream
            .write_all(encoded.as_bytes())
            .await
            .map_err(|source| self.rpc.transport_error(source.to_string()))?;
        stream
            .flush()
            .await
            .map_err(|source| self.rpc.transport_error(source.to_string()))
    }
}

async fn forward_stderr(server: String, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(server = %server, "stderr: {line}");
    }
}
