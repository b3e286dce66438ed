//! Legacy MCP "HTTP with SSE" transport.
//!
//! The client opens a long-lived event stream on the configured URL. The
//! server's first `endpoint` event names the URL that JSON-RPC messages are
//! POSTed to; replies arrive back on the stream as `message` events.

use super::error::ToolInvokeError;
use super::interface::ServerToolInfo;
use super::rpc::{RpcChannel, RpcState};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Url;
use reqwest_eventsource::{Event, EventSource, retry};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Clone)]
pub(super) struct EventStreamConnection {
    inner: Arc<StreamInner>,
}

struct StreamInner {
    name: String,
    url: String,
    http: reqwest::Client,
    rpc: RpcState,
    startup: AsyncMutex<()>,
    post_url: AsyncMutex<Option<Url>>,
    reader: AsyncMutex<Option<JoinHandle<()>>>,
}

impl EventStreamConnection {
    pub(super) fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            inner: Arc::new(StreamInner {
                rpc: RpcState::new(name.clone()),
                name,
                url: url.into(),
                http: reqwest::Client::new(),
                startup: AsyncMutex::new(()),
                post_url: AsyncMutex::new(None),
                reader: AsyncMutex::new(None),
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
        if let Some(handle) = self.inner.reader.lock().await.take() {
            handle.abort();
        }
        self.inner.reset().await;
    }
}

impl StreamInner {
    fn connect_error(&self, message: impl Into<String>) -> ToolInvokeError {
        ToolInvokeError::Connect {
            server: self.name.clone(),
            message: message.into(),
        }
    }

    async fn ensure_running(self: &Arc<Self>) -> Result<(), ToolInvokeError> {
        let _startup = self.startup.lock().await;
        if self.post_url.lock().await.is_some() {
            return Ok(());
        }

        let base = Url::parse(&self.url).map_err(|err| self.connect_error(err.to_string()))?;
        let mut source = EventSource::new(self.http.get(base.clone()))
            .map_err(|err| self.connect_error(err.to_string()))?;
        source.set_retry_policy(Box::new(retry::Never));

        let (endpoint_tx, endpoint_rx) = oneshot::channel();
        let reader_self = Arc::clone(self);
        let handle = tokio::spawn(async move {
            reader_self.reader_loop(source, base, endpoint_tx).await;
        });
        if let Some(previous) = self.reader.lock().await.replace(handle) {
            previous.abort();
        }

        let endpoint = endpoint_rx
            .await
            .map_err(|_| self.connect_error("stream closed before an endpoint event arrived"))?;
        info!(server = %self.name, endpoint = %endpoint, "Connected to MCP event stream");

        if let Err(err) = self.initialize_sequence().await {
            warn!(server = %self.name, %err, "MCP handshake failed");
            if let Some(handle) = self.reader.lock().await.take() {
                handle.abort();
            }
            self.reset().await;
            return Err(err);
        }
        Ok(())
    }

    async fn reader_loop(
        self: Arc<Self>,
        mut source: EventSource,
        base: Url,
        endpoint_tx: oneshot::Sender<Url>,
    ) {
        let mut endpoint_tx = Some(endpoint_tx);
        while let Some(event) = source.next().await {
            match event {
                Ok(Event::Open) => debug!(server = %self.name, "event stream opened"),
                Ok(Event::Message(message)) => match message.event.as_str() {
                    // Only this loop sets the endpoint; `reset` clears it when the loop exits.
                    "endpoint" => match base.join(message.data.trim()) {
                        Ok(url) => {
                            *self.post_url.lock().await = Some(url.clone());
                            if let Some(tx) = endpoint_tx.take() {
                                let _ = tx.send(url);
                            }
                        }
                        Err(err) => {
                            warn!(server = %self.name, data = %message.data, %err, "invalid endpoint event");
                            break;
                        }
                    },
                    "message" => match serde_json::from_str::<Value>(&message.data) {
                        Ok(value) => {
                            if let Err(err) = self.process_inbound_message(value).await {
                                warn!(server = %self.name, %err, "failed to process message from MCP server");
                            }
                        }
                        Err(source) => {
                            warn!(server = %self.name, data = %message.data, %source, "received invalid JSON from MCP server");
                        }
                    },
                    other => debug!(server = %self.name, event = other, "ignoring event"),
                },
                Err(reqwest_eventsource::Error::StreamEnded) => {
                    debug!(server = %self.name, "event stream ended");
                    break;
                }
                Err(err) => {
                    warn!(server = %self.name, %err, "event stream failed");
                    break;
                }
            }
        }

        source.close();
        self.reset().await;
    }

    async fn reset(&self) {
        if self.post_url.lock().await.take().is_some() {
            info!(server = %self.name, "MCP event stream closed");
        }
        self.rpc
            .clear(|server| ToolInvokeError::Terminated {
                server: server.to_string(),
            })
            .await;
    }
}

#[async_trait]
impl RpcChannel for StreamInner {
    fn rpc(&self) -> &RpcState {
        &self.rpc
    }

    async fn write_message(&self, message: &Value) -> Result<(), ToolInvokeError> {
        let target = self
            .post_url
            .lock()
            .await
            .clone()
            .ok_or_else(|| self.rpc.transport_error("event stream is not connected"))?;

        let response = self
            .http
            .post(target)
            .json(message)
            .send()
            .await
            .map_err(|err| self.rpc.transport_error(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(self
                .rpc
                .transport_error(format!("endpoint responded with HTTP {status}")));
        }
        Ok(())
    }
}
