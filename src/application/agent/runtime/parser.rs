use super::{AgentDirective, AgentError, ToolRuntime, Value};

impl ToolRuntime {
    /// Reads the model's reply as a directive.
    ///
    /// Replies that contain no JSON at all are taken as the final answer.
    pub fn parse_agent_action(&self, content: &str) -> Result<AgentDirective, AgentError> {
        match extract_json(content) {
            Some(value) => self.parse_action_value(value),
            None if !content.trim().is_empty() => Ok(AgentDirective::Final {
                response: content.trim().to_string(),
            }),
            None => Err(AgentError::InvalidResponse(
                "model returned an empty reply".into(),
            )),
        }
    }

    fn parse_action_value(&self, value: Value) -> Result<AgentDirective, AgentError> {
        match value {
            Value::Object(map) => {
                let Some(action) = map.get("action").and_then(Value::as_str) else {
                    return Err(AgentError::InvalidResponse(
                        "missing action field in agent response".into(),
                    ));
                };
                match action {
                    "call_tool" => {
                        let tool = map.get("tool").and_then(Value::as_str).ok_or_else(|| {
                            AgentError::InvalidResponse(
                                "call_tool action missing tool field".into(),
                            )
                        })?;
                        let input = map.get("input").cloned().unwrap_or(Value::Null);
                        Ok(AgentDirective::CallTool {
                            tool: tool.to_string(),
                            input,
                        })
                    }
                    "final" => {
                        let response =
                            map.get("response").and_then(Value::as_str).ok_or_else(|| {
                                AgentError::InvalidResponse(
                                    "final action missing response field".into(),
                                )
                            })?;
                        Ok(AgentDirective::Final {
                            response: response.to_string(),
                        })
                    }
                    other => Err(AgentError::InvalidResponse(format!(
                        "unknown action value: {other}"
                    ))),
                }
            }
            Value::String(text) => self.parse_agent_action(&text),
            other => Err(AgentError::InvalidResponse(format!(
                "unsupported response type: {other}"
            ))),
        }
    }
}

pub(super) fn extract_json(content: &str) -> Option<Value> {
    let trimmed = content.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if value.is_object() || value.is_string() {
            return Some(value);
        }
    }

    if trimmed.starts_with("```") {
        let stripped = trimmed
            .trim_start_matches("```json")
            .trim_start_matches("```JSON")
            .trim_start_matches("```");
        if let Some(end) = stripped.rfind("```") {
            if let Ok(value) = serde_json::from_str::<Value>(stripped[..end].trim()) {
                return Some(value);
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                return Some(value);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_json_from_code_fence() {
        let content = "```json\n{\"action\":\"final\",\"response\":\"ok\"}\n```";
        assert_eq!(
            extract_json(content),
            Some(json!({"action": "final", "response": "ok"}))
        );
    }

    #[test]
    fn extracts_embedded_object() {
        let content = "Sure! {\"action\":\"call_tool\",\"tool\":\"scrape\"} hope that helps";
        assert_eq!(
            extract_json(content),
            Some(json!({"action": "call_tool", "tool": "scrape"}))
        );
    }

    #[test]
    fn plain_prose_has_no_json() {
        assert_eq!(extract_json("The capital of France is Paris."), None);
        assert_eq!(extract_json("42"), None);
    }
}
