//! HTTP client for the RAG-&-Rock backend.
//!
//! `ApiClient` speaks the `/api/*` contract over reqwest and implements the
//! core backend traits, so the chat layer can drive it directly.
//! `CredentialStore` persists the login session and supplies the bearer
//! token.

pub mod client;
pub mod credentials;
pub mod error;

pub use client::{error_message, is_accepted_file, ApiClient, ACCEPTED_EXTENSIONS};
pub use credentials::{CredentialStore, Credentials};
pub use error::ClientError;
