//! Browser front-end: an embedded chat page plus the JSON API it drives.

mod docs;
mod dto;
mod error;
mod router;
mod routes;
mod state;

pub use dto::{ConfigurationResponse, ErrorResponse, QueryRequest, QueryResponse, SessionResponse};
pub use error::ServerError;
pub use router::{router, serve, serve_listener};
pub use state::{AppState, spawn_idle_sweep};
