//! HTTP API layer for taskhub.
//!
//! REST endpoints for user accounts, authentication and task management.

pub mod handlers;
mod routes;
mod types;

pub use routes::build_router;
