mod error;
pub mod llm;

use futures::future::BoxFuture;
use serde_json::Value;

pub use error::{QuestionSourceError, QuestionSourceResult};
pub use llm::LlmQuestionSource;

/// Text generation collaborator producing quiz content as JSON.
pub trait QuestionSource: Send + Sync {
    /// Send `prompt` and return the JSON document found in the reply.
    fn complete_json(&self, prompt: String) -> BoxFuture<'static, QuestionSourceResult<Value>>;
}
