//! Shared building blocks for the RAG-&-Rock client.
//!
//! Holds configuration, the top-level error type, the wire types of the
//! backend HTTP contract, and the traits the chat layer talks through.

pub mod backend;
pub mod config;
pub mod error;
pub mod types;

pub use backend::{Anonymous, ChatBackend, DocumentBackend, SessionProvider, StaticToken};
pub use config::{expand_home, RagConfig, StaleResponsePolicy};
pub use error::{RagError, Result};
pub use types::*;
