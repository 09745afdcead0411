use thiserror::Error;

/// Top-level error type for the RAG-&-Rock client.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for RagError` so that `?` works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RagError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Chat error: {0}")]
    Chat(String),
}

impl From<toml::de::Error> for RagError {
    fn from(err: toml::de::Error) -> Self {
        RagError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for RagError {
    fn from(err: toml::ser::Error) -> Self {
        RagError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for RagError {
    fn from(err: serde_json::Error) -> Self {
        RagError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for client operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(RagError, &str)> = vec![
            (
                RagError::Config("bad key".to_string()),
                "Configuration error: bad key",
            ),
            (
                RagError::Serialization("invalid json".to_string()),
                "Serialization error: invalid json",
            ),
            (
                RagError::Api("not found".to_string()),
                "API error: not found",
            ),
            (
                RagError::Auth("no token".to_string()),
                "Authentication error: no token",
            ),
            (
                RagError::Chat("busy".to_string()),
                "Chat error: busy",
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: RagError = io_err.into();
        assert!(matches!(err, RagError::Io(_)));
        assert!(err.to_string().starts_with("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let rag_err: RagError = err.unwrap_err().into();
        assert!(matches!(rag_err, RagError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let rag_err: RagError = err.unwrap_err().into();
        assert!(matches!(rag_err, RagError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let parsed: serde_json::Value = serde_json::from_str("{\"a\": 1}")?;
            Ok(parsed["a"].to_string())
        }

        assert_eq!(inner().unwrap(), "1");
    }
}
