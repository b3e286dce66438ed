use super::{ToolContext, ToolDescriptor, ToolError, ToolInvokeError, ToolRuntime, Value};
use tracing::{debug, info, warn};

pub(crate) struct ToolExecution {
    pub tool: String,
    pub success: bool,
    pub input: Value,
    pub output: Value,
    pub message: Option<String>,
}

impl ToolExecution {
    pub(crate) fn failed(tool: &str, input: Value, error: &ToolError) -> Self {
        Self {
            tool: tool.to_string(),
            success: false,
            input,
            output: Value::Null,
            message: Some(error.user_message()),
        }
    }
}

impl ToolRuntime {
    pub(crate) async fn execute(
        &self,
        context: &ToolContext,
        tool_name: &str,
        input: Value,
    ) -> Result<ToolExecution, ToolError> {
        if tool_name.eq_ignore_ascii_case("list_tools") {
            let output = serde_json::to_value(context).unwrap_or(Value::Null);
            debug!("Agent requested tool catalogue via list_tools");
            return Ok(ToolExecution {
                tool: "list_tools".to_string(),
                success: true,
                input,
                output,
                message: Some(format!("{} tools available.", context.tools.len())),
            });
        }

        let Some(tool) = resolve_tool(context, tool_name) else {
            warn!(requested_tool = %tool_name, "Unknown tool requested by agent");
            return Err(ToolError::UnknownTool(tool_name.to_string()));
        };

        let arguments = match input.clone() {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };

        debug!(tool = %tool.name, server = %tool.server, "Dispatching tool via MCP");
        match self
            .bridge
            .invoke_tool(&tool.server, &tool.name, arguments)
            .await
        {
            Ok(result) => {
                let is_error = result
                    .get("isError")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                let execution = ToolExecution {
                    tool: tool.qualified_name(),
                    success: !is_error,
                    input,
                    message: extract_tool_message(&result),
                    output: result,
                };
                info!(tool = %execution.tool, success = execution.success, "Tool executed");
                Ok(execution)
            }
            Err(ToolInvokeError::NotConfigured { .. }) => {
                Err(ToolError::UnknownTool(tool_name.to_string()))
            }
            Err(source) => {
                warn!(tool = %tool.name, server = %tool.server, %source, "Tool execution failed");
                Err(ToolError::Execution {
                    tool: tool.qualified_name(),
                    source,
                })
            }
        }
    }
}

/// Accepts `server/tool` or a bare tool name; bare names bind to the first
/// server that offers them.
fn resolve_tool<'a>(context: &'a ToolContext, requested: &str) -> Option<&'a ToolDescriptor> {
    let requested = requested.trim();
    if let Some((server, name)) = requested.split_once('/') {
        let qualified = context.tools.iter().find(|tool| {
            tool.server.eq_ignore_ascii_case(server) && tool.name.eq_ignore_ascii_case(name)
        });
        if qualified.is_some() {
            return qualified;
        }
    }
    context
        .tools
        .iter()
        .find(|tool| tool.name.eq_ignore_ascii_case(requested))
}

fn extract_tool_message(result: &Value) -> Option<String> {
    let from_content = result
        .get("content")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|block| {
            block
                .get("type")
                .and_then(Value::as_str)
                .is_some_and(|kind| kind.eq_ignore_ascii_case("text"))
        })
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty());
    if let Some(text) = from_content {
        return Some(text.to_string());
    }

    result
        .get("structuredContent")
        .and_then(|value| value.get("error"))
        .and_then(|error| error.get("message"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> ToolContext {
        let tool = |server: &str, name: &str| ToolDescriptor {
            name: name.to_string(),
            server: server.to_string(),
            description: None,
            input_schema: None,
        };
        ToolContext {
            tools: vec![
                tool("mcp-server-firecrawl", "scrape"),
                tool("browserbase", "scrape"),
                tool("ragie", "retrieve"),
            ],
            servers: Vec::new(),
        }
    }

    #[test]
    fn bare_names_bind_to_first_server() {
        let context = context();
        let tool = resolve_tool(&context, "SCRAPE").expect("resolved");
        assert_eq!(tool.server, "mcp-server-firecrawl");
    }

    #[test]
    fn qualified_names_pick_the_named_server() {
        let context = context();
        let tool = resolve_tool(&context, "browserbase/scrape").expect("resolved");
        assert_eq!(tool.server, "browserbase");
        assert!(resolve_tool(&context, "graphiti/search").is_none());
    }

    #[test]
    fn prefers_text_blocks_for_messages() {
        let result = json!({
            "content": [
                { "type": "image", "data": "..." },
                { "type": "text", "text": "  found 3 documents " }
            ]
        });
        assert_eq!(
            extract_tool_message(&result).as_deref(),
            Some("found 3 documents")
        );

        let structured = json!({ "structuredContent": { "error": { "message": "quota" } } });
        assert_eq!(extract_tool_message(&structured).as_deref(), Some("quota"));
    }
}
