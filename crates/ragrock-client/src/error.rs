//! Error types for the HTTP client.

use ragrock_core::error::RagError;
use thiserror::Error;

/// Errors from talking to the RAG-&-Rock backend.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    /// Non-2xx response. Displays only the server's message so it can be
    /// shown to the user as is.
    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Unsupported file type: {0} (allowed: .pdf, .txt, .doc, .docx, .md)")]
    UnsupportedFileType(String),

    #[error("Admin token is required")]
    MissingAdminToken,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<ClientError> for RagError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Io(e) => RagError::Io(e),
            ClientError::Api { status: 401, message } => RagError::Auth(message),
            ClientError::MissingAdminToken => RagError::Auth("Admin token is required".to_string()),
            ClientError::Decode(msg) => RagError::Serialization(msg),
            other => RagError::Api(other.to_string()),
        }
    }
}
