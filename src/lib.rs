//! Library crate for gameshow-back, exposing modules for binaries and integration tests.

/// Runtime configuration loaded from disk and the environment.
pub mod config;
/// Persistence and question-generation backends.
pub mod dao;
/// Request and response payloads.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP, WebSocket and SSE routers.
pub mod routes;
/// Business logic behind the routes.
pub mod services;
/// Shared application state and the session state machine.
pub mod state;
