//! OpenAI-compatible client implementation

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::traits::ModelProvider;
use super::types::{ModelError, ModelRequest, ModelResponse};
use crate::types::ChatMessage;

const PROVIDER_ID: &str = "openai";
const CHAT_PATH: &str = "/v1/chat/completions";

/// OpenAI-compatible chat completions client
#[derive(Clone)]
pub struct OpenAIClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl OpenAIClient {
    /// Fails when the key is empty so that misconfiguration surfaces at activation.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self, ModelError> {
        Self::with_client(endpoint, api_key, Client::new())
    }

    pub fn with_client(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        http: Client,
    ) -> Result<Self, ModelError> {
        let api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ModelError::missing_api_key(PROVIDER_ID))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    fn build_url(&self, path: &str) -> String {
        let base = self.endpoint.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

#[async_trait]
impl ModelProvider for OpenAIClient {
    async fn chat(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        let url = self.build_url(CHAT_PATH);
        let payload = OpenAIRequest {
            model: request.model.clone(),
            messages: to_openai_format(&request.messages),
            stream: false,
        };

        info!(
            model = request.model.as_str(),
            messages = request.messages.len(),
            "Sending request to OpenAI-compatible provider"
        );

        let response: OpenAIResponse = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ModelError::network(PROVIDER_ID, e))?
            .error_for_status()
            .map_err(|e| ModelError::network(PROVIDER_ID, e))?
            .json()
            .await
            .map_err(|e| ModelError::network(PROVIDER_ID, e))?;
        debug!("Received response from OpenAI-compatible provider");

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| ModelError::invalid_response(PROVIDER_ID, "missing content"))?;

        Ok(ModelResponse::new(content))
    }
}

fn to_openai_format(messages: &[ChatMessage]) -> Vec<Value> {
    messages
        .iter()
        .map(|msg| {
            json!({
                "role": msg.role.as_str(),
                "content": msg.content.clone()
            })
        })
        .collect()
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<Value>,
    stream: bool,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: Option<OpenAIMessage>,
}

#[derive(Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}
