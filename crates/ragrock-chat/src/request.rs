//! Outbound chat request assembly.

use ragrock_core::types::ChatRequest;

use crate::scope::{ChatScope, DEFAULT_K};

/// Build the `POST /api/chat` body for a question under `scope`.
///
/// Pure. `question` is expected to be trimmed and non-empty already; the
/// session controller rejects blank input before calling this.
pub fn build_request(question: &str, scope: &ChatScope) -> ChatRequest {
    ChatRequest {
        question: question.to_string(),
        file_id: scope.file_id,
        keywords: scope.keywords.clone().filter(|keywords| !keywords.is_empty()),
        k: if scope.k == 0 { DEFAULT_K } else { scope.k },
    }
}
