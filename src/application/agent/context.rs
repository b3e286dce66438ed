use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

/// Tools and server guidance discovered at the start of a run.
#[derive(Debug, Clone, Serialize, Default, ToSchema)]
pub struct ToolContext {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<ServerGuidance>,
}

impl ToolContext {
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.servers.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ToolDescriptor {
    pub name: String,
    pub server: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub input_schema: Option<Value>,
}

impl ToolDescriptor {
    /// `server/tool`, the unambiguous spelling accepted from the model.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.server, self.name)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ServerGuidance {
    pub name: String,
    pub instruction: String,
}
