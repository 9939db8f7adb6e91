/// Session record storage backends.
pub mod game_store;
/// Persisted record definitions.
pub mod models;
/// Text generation collaborator used for quiz content.
pub mod question_source;
/// Storage error types shared by every backend.
pub mod storage;
