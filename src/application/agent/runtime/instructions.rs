use super::{ToolContext, ToolRuntime, json};

impl ToolRuntime {
    pub fn compose_system_instructions(&self, context: &ToolContext) -> String {
        let mut lines = vec![
            "You are an autonomous assistant that can call tools to solve user requests."
                .to_string(),
            "All responses must be valid JSON without commentary or code fences.".to_string(),
            "When you need to invoke a tool, respond with: {\"action\":\"call_tool\",\"tool\":\"tool_name\",\"input\":{...}}."
                .to_string(),
            "If two servers offer a tool with the same name, write it as \"server/tool_name\"."
                .to_string(),
            "To obtain the list of available tools, call the special tool: {\"action\":\"call_tool\",\"tool\":\"list_tools\"}."
                .to_string(),
            "When you are ready to give the final answer to the user, respond with: {\"action\":\"final\",\"response\":\"...\"}."
                .to_string(),
            "Answer in the language the user writes in.".to_string(),
        ];

        if context.is_empty() {
            lines.push("No tools are currently available.".to_string());
            return lines.join(" ");
        }

        for guidance in &context.servers {
            lines.push(format!(
                "Server '{}' guidance: {}",
                guidance.name, guidance.instruction
            ));
        }

        if !context.tools.is_empty() {
            lines.push("Available tools:".to_string());
            for descriptor in &context.tools {
                let mut line = format!("- {} (server: {})", descriptor.name, descriptor.server);
                if let Some(description) = &descriptor.description {
                    line.push_str(&format!(": {}", description.trim()));
                }
                if let Some(schema) = &descriptor.input_schema {
                    let compact = serde_json::to_string(schema).unwrap_or_default();
                    line.push_str(&format!(". Input schema: {compact}"));
                }
                lines.push(line);
            }
        }

        lines.join(" ")
    }

    pub fn initial_user_prompt(&self, prompt: &str) -> String {
        json!({
            "action": "user_request",
            "prompt": prompt,
        })
        .to_string()
    }
}
