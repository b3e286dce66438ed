use crate::session::{Notice, SessionStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
    pub status: SessionStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QueryResponse {
    pub session_id: String,
    /// Set when the query was not run, e.g. before activation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    pub failed: bool,
    pub status: SessionStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConfigurationResponse {
    pub servers: Vec<String>,
    #[schema(value_type = Object)]
    pub configuration: Value,
}
