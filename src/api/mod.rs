//! HTTP API over the orchestration actions.
//!
//! Routes are nested under `/api/`. Request and response bodies are JSON in
//! camelCase; every error is `{"error": "<text>"}`.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server, ApiServer};
pub use types::ApiContext;
