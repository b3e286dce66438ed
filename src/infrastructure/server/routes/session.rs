use super::super::dto::{ErrorResponse, QueryRequest, QueryResponse, SessionResponse};
use super::super::state::{AppState, SharedController};
use super::{ApiError, api_error};
use crate::session::SubmitOutcome;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

async fn lookup(state: &AppState, id: &str) -> Result<(Uuid, SharedController), ApiError> {
    let parsed = Uuid::parse_str(id)
        .map_err(|_| api_error(StatusCode::NOT_FOUND, format!("unknown session '{id}'")))?;
    match state.session(&parsed).await {
        Some(controller) => Ok((parsed, controller)),
        None => {
            warn!(session_id = %parsed, "Request for unknown session");
            Err(api_error(
                StatusCode::NOT_FOUND,
                format!("unknown session '{id}'"),
            ))
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/sessions",
    tag = "session",
    responses(
        (status = 201, description = "New idle session", body = SessionResponse)
    )
)]
pub async fn create_session_handler(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<SessionResponse>) {
    let (id, controller) = state.create_session().await;
    let status = controller.lock().await.status();
    (
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id: id.to_string(),
            notice: None,
            status,
        }),
    )
}

#[utoipa::path(
    get,
    path = "/api/sessions/{id}",
    tag = "session",
    params(("id" = String, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session state and transcript", body = SessionResponse),
        (status = 404, description = "Unknown session", body = ErrorResponse)
    )
)]
pub async fn get_session_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let (id, controller) = lookup(&state, &id).await?;
    let status = controller.lock().await.status();
    Ok(Json(SessionResponse {
        session_id: id.to_string(),
        notice: None,
        status,
    }))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/activate",
    tag = "session",
    params(("id" = String, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Activation attempted; see notice", body = SessionResponse),
        (status = 404, description = "Unknown session", body = ErrorResponse)
    )
)]
pub async fn activate_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let (id, controller) = lookup(&state, &id).await?;
    info!(session_id = %id, "Activation requested");
    let mut controller = controller.lock().await;
    let notice = controller.activate().await;
    Ok(Json(SessionResponse {
        session_id: id.to_string(),
        notice: Some(notice),
        status: controller.status(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/messages",
    tag = "session",
    params(("id" = String, Path, description = "Session identifier")),
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Query handled", body = QueryResponse),
        (status = 400, description = "Empty query", body = ErrorResponse),
        (status = 404, description = "Unknown session", body = ErrorResponse)
    )
)]
pub async fn message_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let (id, controller) = lookup(&state, &id).await?;
    let query = payload.query.trim();
    if query.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "query cannot be empty"));
    }

    debug!(session_id = %id, "Query received");
    let mut controller = controller.lock().await;
    let (notice, reply, failed) = match controller.submit_query(query).await {
        SubmitOutcome::Rejected(notice) => (Some(notice), None, false),
        SubmitOutcome::Completed(outcome) => (None, Some(outcome.render()), outcome.is_failed()),
    };
    Ok(Json(QueryResponse {
        session_id: id.to_string(),
        notice,
        reply,
        failed,
        status: controller.status(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/sessions/{id}/reset",
    tag = "session",
    params(("id" = String, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session cleared", body = SessionResponse),
        (status = 404, description = "Unknown session", body = ErrorResponse)
    )
)]
pub async fn reset_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let (id, controller) = lookup(&state, &id).await?;
    let mut controller = controller.lock().await;
    let notice = controller.reset().await;
    Ok(Json(SessionResponse {
        session_id: id.to_string(),
        notice: Some(notice),
        status: controller.status(),
    }))
}

#[utoipa::path(
    delete,
    path = "/api/sessions/{id}",
    tag = "session",
    params(("id" = String, Path, description = "Session identifier")),
    responses(
        (status = 204, description = "Session closed and its agent released"),
        (status = 404, description = "Unknown session", body = ErrorResponse)
    )
)]
pub async fn close_session_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let unknown = || api_error(StatusCode::NOT_FOUND, format!("unknown session '{id}'"));
    let parsed = Uuid::parse_str(&id).map_err(|_| unknown())?;
    if state.close_session(&parsed).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        warn!(session_id = %parsed, "Close requested for unknown session");
        Err(unknown())
    }
}
