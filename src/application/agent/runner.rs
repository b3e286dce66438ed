use super::directive::AgentDirective;
use super::errors::AgentError;
use super::models::{AgentOptions, AgentOutcome, AgentStep};
use super::runtime::{ToolExecution, ToolRuntime};
use crate::application::tooling::ToolServerInterface;
use crate::model::{ModelProvider, ModelRequest};
use crate::types::ChatMessage;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Tool-calling agent over one model provider and one set of tool servers.
///
/// Earlier question/answer pairs are replayed to the model so follow-up
/// questions keep their context.
pub struct Agent<P: ModelProvider> {
    provider: P,
    runtime: ToolRuntime,
    options: AgentOptions,
    memory: Mutex<Vec<ChatMessage>>,
}

impl<P: ModelProvider> Agent<P> {
    pub fn new(provider: P, bridge: Arc<dyn ToolServerInterface>, options: AgentOptions) -> Self {
        Self {
            provider,
            runtime: ToolRuntime::new(bridge),
            options,
            memory: Mutex::new(Vec::new()),
        }
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    pub async fn run(&self, prompt: &str) -> Result<AgentOutcome, AgentError> {
        info!(max_steps = self.options.max_steps, "Agent run started");
        let context = self.runtime.build_context().await;
        let instructions = self.runtime.compose_system_instructions(&context);
        let system_prompt = match self.options.system_prompt.as_deref() {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{existing}\n\n{instructions}")
            }
            _ => instructions,
        };

        let mut messages = vec![ChatMessage::system(system_prompt)];
        messages.extend(self.memory.lock().await.iter().cloned());
        messages.push(ChatMessage::user(self.runtime.initial_user_prompt(prompt)));

        let mut steps = Vec::new();
        let mut remaining_steps = self.options.max_steps;

        loop {
            debug!(
                remaining_steps,
                turns = messages.len(),
                "Submitting agent turn to model provider"
            );
            let request = ModelRequest {
                model: self.options.model.clone(),
                messages: messages.clone(),
            };
            let reply = self.provider.chat(request).await?;
            let content = reply.message.content;

            match self.runtime.parse_agent_action(&content)? {
                AgentDirective::Final { response } => {
                    info!(steps = steps.len(), "Agent returned final response");
                    let mut memory = self.memory.lock().await;
                    memory.push(ChatMessage::user(prompt));
                    memory.push(ChatMessage::assistant(response.clone()));
                    return Ok(AgentOutcome { response, steps });
                }
                AgentDirective::CallTool { tool, input } => {
                    if remaining_steps == 0 {
                        warn!(max_steps = self.options.max_steps, "Agent exceeded max tool interactions");
                        return Err(AgentError::StepLimitExceeded {
                            max_steps: self.options.max_steps,
                        });
                    }
                    remaining_steps -= 1;
                    info!(tool = %tool, "Agent requested tool execution");

                    let execution = match self.runtime.execute(&context, &tool, input.clone()).await {
                        Ok(execution) => execution,
                        Err(err) => ToolExecution::failed(&tool, input, &err),
                    };

                    steps.push(AgentStep {
                        tool: execution.tool.clone(),
                        input: execution.input.clone(),
                        success: execution.success,
                        output: execution.output.clone(),
                        message: execution.message.clone(),
                    });

                    messages.push(ChatMessage::assistant(content));
                    messages.push(ChatMessage::user(
                        json!({
                            "tool_result": {
                                "tool": execution.tool,
                                "input": execution.input,
                                "success": execution.success,
                                "output": execution.output,
                                "message": execution.message,
                            }
                        })
                        .to_string(),
                    ));
                }
            }
        }
    }

    /// Releases every tool-server connection held by this agent.
    pub async fn shutdown(&self) {
        self.runtime.shutdown().await;
    }
}
