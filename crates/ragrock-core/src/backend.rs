//! Seams between the chat layer and the remote backend.
//!
//! The chat crate depends only on these traits so it can be driven by an
//! in-memory fake in tests and by the HTTP client in the binary.

use async_trait::async_trait;

use crate::types::{ChatRequest, ChatResponse, FileListItem};

/// Answers chat requests (`POST /api/chat`).
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Failure type. Its `Display` text is shown to the user verbatim.
    type Error: std::error::Error + Send + Sync + 'static;

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, Self::Error>;
}

/// Lists and deletes documents (`/api/files`).
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn list_files(&self) -> Result<Vec<FileListItem>, Self::Error>;

    async fn delete_file(&self, file_id: i64) -> Result<(), Self::Error>;
}

/// Supplies the bearer token for authenticated requests, if any.
pub trait SessionProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// A session with no credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl SessionProvider for Anonymous {
    fn token(&self) -> Option<String> {
        None
    }
}

/// A fixed token, e.g. one passed on the command line.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl SessionProvider for StaticToken {
    fn token(&self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.clone())
        }
    }
}
