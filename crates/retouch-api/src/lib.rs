//! Retouch API
//!
//! HTTP surface of the image session engine: the in-memory session store,
//! the dispatcher that serializes edits per session, handlers and setup.

mod api_doc;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod setup;
pub mod state;
pub mod telemetry;

pub use error::{ErrorResponse, HttpAppError};
pub use services::{SessionDispatcher, SessionStore};
pub use state::AppState;
