use super::super::dto::ConfigurationResponse;
use super::super::state::AppState;
use axum::Json;
use axum::extract::State;
use std::sync::Arc;
use tracing::debug;

#[utoipa::path(
    get,
    path = "/api/configuration",
    tag = "config",
    responses(
        (status = 200, description = "Tool servers that an activation would use, secrets masked", body = ConfigurationResponse)
    )
)]
pub async fn configuration_handler(State(state): State<Arc<AppState>>) -> Json<ConfigurationResponse> {
    let configuration = state.source().load();
    debug!(servers = configuration.len(), "Serving configuration preview");
    Json(ConfigurationResponse {
        servers: configuration.names().into_iter().map(str::to_string).collect(),
        configuration: configuration.redacted().to_json(),
    })
}
