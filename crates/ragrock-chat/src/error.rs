//! Error types for the chat layer.

use ragrock_core::error::RagError;

/// Errors from the chat session and document library.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("question cannot be empty")]
    EmptyQuestion,
    #[error("a request is already in flight")]
    Busy,
    #[error("unknown file: {0}")]
    UnknownFile(i64),
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<ChatError> for RagError {
    fn from(err: ChatError) -> Self {
        RagError::Chat(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::EmptyQuestion.to_string(), "question cannot be empty");
        assert_eq!(ChatError::Busy.to_string(), "a request is already in flight");
        assert_eq!(ChatError::UnknownFile(9).to_string(), "unknown file: 9");
        assert_eq!(
            ChatError::InvalidTransition {
                from: "Idle".into(),
                to: "Idle".into()
            }
            .to_string(),
            "invalid state transition: Idle -> Idle"
        );
        assert_eq!(
            ChatError::Backend("connection refused".into()).to_string(),
            "backend error: connection refused"
        );
    }

    #[test]
    fn test_chat_error_into_rag_error() {
        let err: RagError = ChatError::UnknownFile(3).into();
        assert!(matches!(err, RagError::Chat(_)));
        assert!(err.to_string().contains("unknown file: 3"));
    }
}
