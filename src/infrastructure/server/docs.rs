use super::dto::{ConfigurationResponse, ErrorResponse, QueryRequest, QueryResponse, SessionResponse};
use super::routes;
use crate::session::{Notice, NoticeLevel, SessionState, SessionStatus};
use crate::types::{ChatMessage, MessageRole};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::session::create_session_handler,
        routes::session::get_session_handler,
        routes::session::activate_handler,
        routes::session::message_handler,
        routes::session::reset_handler,
        routes::session::close_session_handler,
        routes::config::configuration_handler
    ),
    components(
        schemas(
            SessionResponse,
            QueryRequest,
            QueryResponse,
            ConfigurationResponse,
            ErrorResponse,
            SessionStatus,
            SessionState,
            Notice,
            NoticeLevel,
            ChatMessage,
            MessageRole
        )
    ),
    tags(
        (name = "session", description = "Activate, query and reset chat sessions"),
        (name = "config", description = "Tool-server configuration preview")
    )
)]
pub(super) struct ApiDoc;
