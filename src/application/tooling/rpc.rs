//! JSON-RPC 2.0 plumbing shared by the process and event-stream transports.

use super::error::ToolInvokeError;
use super::interface::ServerToolInfo;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tracing::{debug, warn};

pub(super) const PROTOCOL_VERSION: &str = "2025-06-18";

type Responder = oneshot::Sender<Result<Value, ToolInvokeError>>;

pub(super) struct RpcState {
    server: String,
    pending: AsyncMutex<HashMap<String, Responder>>,
    id_counter: AtomicU64,
    instructions: AsyncMutex<Option<String>>,
    tool_cache: AsyncMutex<Vec<ServerToolInfo>>,
    tools_stale: AtomicBool,
}

impl RpcState {
    pub(super) fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            pending: AsyncMutex::new(HashMap::new()),
            id_counter: AtomicU64::new(1),
            instructions: AsyncMutex::new(None),
            tool_cache: AsyncMutex::new(Vec::new()),
            tools_stale: AtomicBool::new(true),
        }
    }

    pub(super) fn transport_error(&self, message: impl Into<String>) -> ToolInvokeError {
        ToolInvokeError::Transport {
            server: self.server.clone(),
            message: message.into(),
        }
    }

    pub(super) async fn instructions(&self) -> Option<String> {
        self.instructions.lock().await.clone()
    }

    fn next_id(&self) -> String {
        let id = self.id_counter.fetch_add(1, Ordering::SeqCst);
        format!("req-{id}")
    }

    /// Fails every in-flight request and forgets cached server metadata.
    pub(super) async fn clear(&self, reason: impl Fn(&str) -> ToolInvokeError) {
        let mut pending = self.pending.lock().await;
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(reason(&self.server)));
        }
        drop(pending);
        self.tool_cache.lock().await.clear();
        self.instructions.lock().await.take();
        self.tools_stale.store(true, Ordering::SeqCst);
    }
}

/// A connection able to write one JSON-RPC message to a server.
///
/// Inbound messages are fed to [`RpcChannel::process_inbound_message`] by the
/// transport's reader task.
#[async_trait]
pub(super) trait RpcChannel: Send + Sync {
    fn rpc(&self) -> &RpcState;

    async fn write_message(&self, message: &Value) -> Result<(), ToolInvokeError>;

    async fn send_request(&self, method: &str, params: Value) -> Result<Value, ToolInvokeError> {
        let rpc = self.rpc();
        let id = rpc.next_id();
        let (tx, rx) = oneshot::channel();
        rpc.pending.lock().await.insert(id.clone(), tx);

        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        });
        if let Err(err) = self.write_message(&payload).await {
            rpc.pending.lock().await.remove(&id);
            return Err(err);
        }

        match rx.await {
            Ok(Ok(value)) => Ok(value.get("result").cloned().unwrap_or(Value::Null)),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(ToolInvokeError::Cancelled {
                server: rpc.server.clone(),
            }),
        }
    }

    async fn send_notification(&self, method: &str, params: Value) -> Result<(), ToolInvokeError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params
        });
        self.write_message(&payload).await
    }

    async fn initialize_sequence(&self) -> Result<(), ToolInvokeError> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
                "title": "MCP Assistant"
            },
            "capabilities": {}
        });
        let init_result = self.send_request("initialize", params).await?;
        if let Some(text) = init_result.get("instructions").and_then(Value::as_str) {
            *self.rpc().instructions.lock().await = Some(text.to_string());
        }
        self.send_notification("notifications/initialized", json!({}))
            .await?;
        self.refresh_tools().await
    }

    async fn refresh_tools(&self) -> Result<(), ToolInvokeError> {
        let result = self.send_request("tools/list", json!({})).await?;
        let tools = parse_tool_list(&result);
        debug!(server = %self.rpc().server, count = tools.len(), "Tool catalogue refreshed");
        *self.rpc().tool_cache.lock().await = tools;
        self.rpc().tools_stale.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn cached_tools(&self) -> Result<Vec<ServerToolInfo>, ToolInvokeError> {
        if self.rpc().tools_stale.load(Ordering::SeqCst) {
            self.refresh_tools().await?;
        }
        Ok(self.rpc().tool_cache.lock().await.clone())
    }

    async fn call_tool(&self, tool: &str, arguments: Value) -> Result<Value, ToolInvokeError> {
        let params = json!({
            "name": tool,
            "arguments": match arguments {
                Value::Null => Value::Object(Default::default()),
                other => other,
            }
        });
        self.send_request("tools/call", params).await
    }

    async fn process_inbound_message(&self, value: Value) -> Result<(), ToolInvokeError> {
        match (value.get("id").cloned(), value.get("method").is_some()) {
            (Some(id), true) => self.handle_server_request(id, value).await,
            (Some(id), false) => {
                self.handle_response(id, value).await;
                Ok(())
            }
            (None, true) => {
                self.handle_notification(&value);
                Ok(())
            }
            (None, false) => Ok(()),
        }
    }

    async fn handle_response(&self, id: Value, value: Value) {
        let rpc = self.rpc();
        let Some(key) = response_key(&id) else {
            return;
        };
        let Some(sender) = rpc.pending.lock().await.remove(&key) else {
            debug!(server = %rpc.server, response_id = key, "received response for unknown request");
            return;
        };

        let outcome = match value.get("error") {
            Some(error) => Err(match error.as_object() {
                Some(err) => ToolInvokeError::Rpc {
                    server: rpc.server.clone(),
                    code: err.get("code").and_then(Value::as_i64).unwrap_or(-32000),
                    message: err
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error")
                        .to_string(),
                },
                None => rpc.transport_error("missing error payload in response"),
            }),
            None => Ok(value),
        };
        let _ = sender.send(outcome);
    }

    async fn handle_server_request(&self, id: Value, value: Value) -> Result<(), ToolInvokeError> {
        let method = value
            .get("method")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let payload = match method {
            "ping" => json!({ "jsonrpc": "2.0", "id": id, "result": {} }),
            other => {
                warn!(server = %self.rpc().server, method = other, "server sent unsupported request");
                json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {
                        "code": -32601,
                        "message": format!("client does not implement method '{other}'"),
                    }
                })
            }
        };
        self.write_message(&payload).await
    }

    fn handle_notification(&self, value: &Value) {
        let Some(method) = value.get("method").and_then(Value::as_str) else {
            return;
        };
        debug!(server = %self.rpc().server, method, "received notification from server");
        if method == "notifications/tools/list_changed" {
            self.rpc().tools_stale.store(true, Ordering::SeqCst);
        }
    }
}

pub(super) fn parse_tool_list(result: &Value) -> Vec<ServerToolInfo> {
    result
        .get("tools")
        .and_then(Value::as_array)
        .map(|tools| {
            tools
                .iter()
                .filter_map(|tool| {
                    let name = tool.get("name").and_then(Value::as_str)?;
                    Some(ServerToolInfo {
                        name: name.to_string(),
                        description: tool
                            .get("description")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        input_schema: tool.get("inputSchema").cloned(),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

fn response_key(id: &Value) -> Option<String> {
    match id {
        Value::String(value) => Some(value.clone()),
        Value::Number(num) => Some(num.to_string()),
        _ => None,
    }
}
