//! Tubely API Library
//!
//! HTTP surface of the video upload pipeline: handlers, auth middleware, the upload
//! orchestrator and application setup.

mod api_doc;
pub mod constants;
mod handlers;
pub mod services;
pub mod setup;
mod telemetry;
mod utils;

// Public modules
pub mod auth;
pub mod error;
pub mod state;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
