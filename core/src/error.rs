//! Error types for the face service client.
//!
//! # Design
//! Every failure the client can produce lands in one `FaceError`. Non-success
//! HTTP statuses are not split by code: they all become `Api` with the
//! operation label, the raw status code and the raw body text, so callers can
//! inspect whatever the service sent back.

use thiserror::Error;

/// Boxed error returned by a token provider.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by `FaceServiceClient` and its configuration builder.
#[derive(Debug, Error)]
pub enum FaceError {
    /// The client was configured without a required field or with
    /// conflicting credentials.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The token provider failed while the client was being built.
    #[error("token provider failed: {0}")]
    TokenProvider(#[source] BoxError),

    /// The HTTP round-trip itself failed (DNS, TLS, connection reset, ...).
    #[error("transport error: {0}")]
    Transport(#[from] ureq::Error),

    /// The service answered with a status outside 200, 201 and 204.
    #[error("Error in {operation}: {status} - {body}")]
    Api {
        operation: String,
        status: u16,
        body: String,
    },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// A 200/201 response body was not valid JSON.
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FaceError {
    /// HTTP status carried by an `Api` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            FaceError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        FaceError::Config(msg.into())
    }
}
