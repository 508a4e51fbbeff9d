//! HTTP API: prompt optimization, liveness and savings report

pub mod handlers;
pub mod routes;

pub use handlers::{AppState, SustainRequest};
pub use routes::build_router;
