//! cipherguess Proxy
//!
//! HTTP orchestrator in front of a ciphertext classification service.
//!
//! Callers post ciphertext to `/guess`; the orchestrator validates the request,
//! forwards the ciphertext unchanged to the service's `/predict`, and returns the
//! prediction in a stable envelope. Service failures are mapped to distinct
//! status codes: 400 for bad requests, 503 when the service cannot be reached,
//! 500 when it answers with an error.

pub mod backend;
pub mod client;
pub mod config;
pub mod orchestrator;
pub mod routes;
pub mod security;

pub use backend::{ClassificationBackend, HttpBackend};
pub use config::{ConfigError, OrchestratorConfig, ServeArgs};
pub use orchestrator::Orchestrator;
pub use routes::{build_app, create_router, AppState};
