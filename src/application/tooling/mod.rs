//! MCP tool client: one lazily started connection per configured server.

mod error;
mod event_stream;
mod interface;
mod manager;
mod process;
mod rpc;

pub use error::ToolInvokeError;
pub use interface::{ServerToolInfo, ToolServerInterface};
pub use manager::ServerManager;
