use super::docs::ApiDoc;
use super::error::ServerError;
use super::routes;
use super::state::{AppState, spawn_idle_sweep};
use axum::http::Method;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use utoipa::OpenApi;

pub fn router(state: Arc<AppState>) -> Router {
    let api = ApiDoc::openapi();
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(routes::page::index_handler))
        .route(
            "/api-doc/openapi.json",
            get(move || {
                let api = api.clone();
                async move { Json(api) }
            }),
        )
        .route("/api/sessions", post(routes::session::create_session_handler))
        .route(
            "/api/sessions/{id}",
            get(routes::session::get_session_handler).delete(routes::session::close_session_handler),
        )
        .route(
            "/api/sessions/{id}/activate",
            post(routes::session::activate_handler),
        )
        .route(
            "/api/sessions/{id}/messages",
            post(routes::session::message_handler),
        )
        .route("/api/sessions/{id}/reset", post(routes::session::reset_handler))
        .route(
            "/api/configuration",
            get(routes::config::configuration_handler),
        )
        .layer(cors)
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> Result<(), ServerError> {
    info!(%addr, "Binding web server");
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    serve_listener(state, listener).await
}

/// Serves on an already bound listener until ctrl-c, then resets every session.
///
/// Sessions idle for longer than the state's idle timeout are evicted while
/// the server runs.
pub async fn serve_listener(state: Arc<AppState>, listener: TcpListener) -> Result<(), ServerError> {
    let addr = listener.local_addr()?;
    info!(%addr, "Web server ready; open http://{addr}/ in a browser");

    let sweep = spawn_idle_sweep(&state);
    let app = router(Arc::clone(&state));
    let served = axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await
        .map_err(ServerError::Serve);

    sweep.abort();
    state.shutdown().await;
    served
}
