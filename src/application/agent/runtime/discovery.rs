use super::{ServerGuidance, ToolContext, ToolDescriptor, ToolRuntime};
use tracing::{debug, warn};

impl ToolRuntime {
    /// Lists the tools of every configured server, starting servers on demand.
    ///
    /// A server that cannot be started or listed is left out of the context.
    pub async fn build_context(&self) -> ToolContext {
        let mut context = ToolContext::default();

        for server in self.bridge.server_names() {
            let tools = match self.bridge.list_tools(&server).await {
                Ok(tools) => tools,
                Err(err) => {
                    warn!(server = %server, %err, "Skipping tool server that failed to start");
                    continue;
                }
            };
            debug!(server = %server, count = tools.len(), "Discovered tools");

            if let Some(instruction) = self.bridge.server_instructions(&server).await {
                let instruction = instruction.trim();
                if !instruction.is_empty() {
                    context.servers.push(ServerGuidance {
                        name: server.clone(),
                        instruction: instruction.to_string(),
                    });
                }
            }

            context
                .tools
                .extend(tools.into_iter().map(|info| ToolDescriptor {
                    name: info.name,
                    server: server.clone(),
                    description: info.description,
                    input_schema: info.input_schema,
                }));
        }

        context
    }
}
