//! HTTP server for saved JSON state.
//!
//! Exposes the state pipeline over a small axum router: `POST /json` saves a
//! document and answers with its public reference, `GET /json/:id` serves it
//! back. `POST /json/post` is kept as an alias for older clients.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::AppState;
pub use server::StateServer;
