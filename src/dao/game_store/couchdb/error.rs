//! Error types shared by the CouchDB storage implementation.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias returning [`CouchDaoError`] failures.
pub type CouchResult<T> = Result<T, CouchDaoError>;

/// Failures that can occur while interacting with CouchDB.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    /// Required environment variable is missing.
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar {
        /// Name of the missing variable.
        var: &'static str,
    },
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build CouchDB client")]
    ClientBuilder {
        /// Underlying failure.
        #[source]
        source: reqwest::Error,
    },
    /// Probing or creating the target database failed before any reply.
    #[error("failed to {action} CouchDB database `{database}`")]
    DatabaseRequest {
        /// Database name.
        database: String,
        /// Operation that failed (`query` or `create`).
        action: &'static str,
        /// Underlying failure.
        #[source]
        source: reqwest::Error,
    },
    /// CouchDB returned an unexpected status code for a database operation.
    #[error("unexpected CouchDB database response status {status} for `{database}`")]
    DatabaseStatus {
        /// Database name.
        database: String,
        /// Status code returned by CouchDB.
        status: StatusCode,
    },
    /// A request to a document endpoint could not be sent.
    #[error("failed to send CouchDB request to `{path}`")]
    RequestSend {
        /// Request path or document id.
        path: String,
        /// Underlying failure.
        #[source]
        source: reqwest::Error,
    },
    /// CouchDB returned an unexpected status code for a document endpoint.
    #[error("unexpected CouchDB response status {status} for `{path}`")]
    RequestStatus {
        /// Request path or document id.
        path: String,
        /// Status code returned by CouchDB.
        status: StatusCode,
    },
    /// A document with the same id already exists.
    #[error("CouchDB document `{path}` already exists")]
    Conflict {
        /// Request path or document id.
        path: String,
    },
    /// Response payload could not be parsed into JSON.
    #[error("failed to decode CouchDB response for `{path}`")]
    DecodeResponse {
        /// Request path or document id.
        path: String,
        /// Underlying failure.
        #[source]
        source: reqwest::Error,
    },
    /// Decoding a JSON value into the expected model failed.
    #[error("failed to deserialize CouchDB value for `{path}`")]
    DeserializeValue {
        /// Request path or document id.
        path: String,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },
    /// Encoding a record into a document failed.
    #[error("failed to serialize CouchDB document `{path}`")]
    SerializeDocument {
        /// Request path or document id.
        path: String,
        /// Underlying failure.
        #[source]
        source: serde_json::Error,
    },
    /// A bulk write rejected some documents.
    #[error("CouchDB bulk write rejected documents: {doc_ids:?}")]
    BulkRejected {
        /// Ids of the rejected documents.
        doc_ids: Vec<String>,
    },
}
