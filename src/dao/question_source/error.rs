//! Error types of the question generation client.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias returning [`QuestionSourceError`] failures.
pub type QuestionSourceResult<T> = Result<T, QuestionSourceError>;

/// Failures that can occur while asking the text generation service for questions.
#[derive(Debug, Error)]
pub enum QuestionSourceError {
    /// No API key configured for the selected provider.
    #[error("missing LLM_API_KEY/OPENAI_API_KEY/ANTHROPIC_API_KEY")]
    MissingApiKey,
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build LLM client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be sent or timed out.
    #[error("failed to send LLM request to `{url}`")]
    RequestSend {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The provider answered with a non-success status.
    #[error("unexpected LLM response status {status} from `{url}`")]
    RequestStatus { url: String, status: StatusCode },
    /// The provider envelope could not be decoded.
    #[error("failed to decode LLM response from `{url}`")]
    DecodeResponse {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The envelope carried no text content.
    #[error("LLM response missing text content")]
    MissingContent,
    /// The generated text is not valid JSON.
    #[error("LLM returned invalid JSON")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },
}
