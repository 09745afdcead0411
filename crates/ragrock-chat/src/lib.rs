//! Chat session orchestration for the RAG-&-Rock client.
//!
//! Turns user input plus the current document scope into chat requests,
//! keeps at most one request in flight per session, and records every turn
//! (including failures) in an append-only transcript.

pub mod controller;
pub mod error;
pub mod library;
pub mod request;
pub mod scope;
pub mod state;
pub mod transcript;

pub use controller::{failure_message, PendingTurn, SessionController, SubmitOutcome};
pub use error::ChatError;
pub use library::DocumentLibrary;
pub use request::build_request;
pub use scope::{parse_k, parse_keywords, ChatScope, ScopeState, DEFAULT_K, MAX_K, MIN_K};
pub use state::{SessionState, StateMachine};
pub use transcript::{Message, MessageId, MessageIdGenerator, Role, Transcript};
