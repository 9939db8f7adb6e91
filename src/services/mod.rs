/// Buzz-in attempts and window control.
pub mod buzz_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Round state patches and team scores.
pub mod game_state_service;
/// Health check service.
pub mod health_service;
/// Host PIN hashing and verification.
pub mod host_pin;
/// Join code generation with bounded retries.
pub mod join_code;
/// Player connectivity updates.
pub mod player_service;
/// Quiz content generation.
pub mod question_service;
/// Session lifecycle and lookups.
pub mod session_service;
/// Server-Sent Events snapshot streams.
pub mod sse_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
/// Per-session serialized mutations and snapshot fan-out.
pub mod sync_service;
/// WebSocket snapshot streams.
pub mod websocket_service;
