//! Wire types of the backend HTTP contract.
//!
//! These mirror the JSON bodies exchanged with `/api/*`. Field names follow
//! the backend (snake_case) so the structs serialise without renames.

use serde::{Deserialize, Serialize};

// =============================================================================
// Documents
// =============================================================================

/// A document as listed by `GET /api/files`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileListItem {
    pub id: i64,
    pub filename: String,
    pub upload_time: String,
    /// Metadata blob, normally a JSON document encoded as a string.
    #[serde(default)]
    pub file_metadata: serde_json::Value,
}

impl FileListItem {
    /// Parse the metadata blob.
    ///
    /// Never fails: invalid JSON, non-object JSON and missing metadata all
    /// yield an empty map.
    pub fn metadata(&self) -> FileMetadata {
        let parsed = match &self.file_metadata {
            serde_json::Value::String(raw) => serde_json::from_str(raw).ok(),
            serde_json::Value::Object(map) => Some(serde_json::Value::Object(map.clone())),
            _ => None,
        };

        match parsed {
            Some(serde_json::Value::Object(map)) => FileMetadata(map),
            _ => {
                tracing::debug!(file_id = self.id, "Unparseable file metadata, using empty map");
                FileMetadata::default()
            }
        }
    }
}

/// Parsed document metadata. Keys are backend-defined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileMetadata(pub serde_json::Map<String, serde_json::Value>);

impl FileMetadata {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Page count, when the backend extracted one.
    pub fn pages(&self) -> Option<u64> {
        self.0.get("pages").and_then(|v| v.as_u64())
    }
}

/// Response of `POST /api/upload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileUploadResponse {
    pub id: i64,
    pub filename: String,
}

// =============================================================================
// Chat
// =============================================================================

/// Body of `POST /api/chat`.
///
/// `file_id` is always present (`null` means all documents); `keywords` is
/// omitted entirely when there is no keyword filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub question: String,
    pub file_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    pub k: u32,
}

/// A source record backing an answer.
///
/// Opaque: the client only counts and forwards citations, so the payload is
/// kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Citation(pub serde_json::Value);

impl Citation {
    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Response of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<Citation>,
}

// =============================================================================
// Health and administration
// =============================================================================

/// Status of one backend component in the health report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentHealth {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    /// Model name, reported by the LLM component only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Response of `GET /api/health`.
///
/// `status` is one of `healthy`, `degraded` or `unhealthy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<ComponentHealth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vectorstore: Option<ComponentHealth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm: Option<ComponentHealth>,
}

impl HealthStatus {
    /// Every component is up. Older backends report `ok` instead of `healthy`.
    pub fn is_healthy(&self) -> bool {
        matches!(self.status.as_str(), "healthy" | "ok")
    }
}

/// Response of `POST /api/admin/clear_all`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminClearAllResponse {
    pub status: String,
    pub files_deleted: u64,
    pub chats_deleted: u64,
}

// =============================================================================
// Tests
// =============================================================================
