//! HTTP surface of the pipeline.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::create_router;
pub use server::{bind, serve, shutdown_signal};
pub use state::{AppState, Components};
