//! Append-only conversation log.
//!
//! Messages are immutable once created and kept in insertion order. The only
//! removal is `clear`, which empties the whole log and starts a new
//! generation.

use std::fmt;

use chrono::{DateTime, Utc};
use ragrock_core::types::Citation;
use serde::Serialize;

// =============================================================================
// Identifiers
// =============================================================================

/// Creation-ordered message identifier (nanoseconds since the Unix epoch,
/// bumped when the clock does not advance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MessageId(i64);

impl MessageId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generates strictly increasing `MessageId`s for one session.
#[derive(Debug, Default)]
pub struct MessageIdGenerator {
    last: i64,
}

impl MessageIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> MessageId {
        let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MIN);
        let id = now.max(self.last.saturating_add(1));
        self.last = id;
        MessageId(id)
    }
}

// =============================================================================
// Message
// =============================================================================

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One transcript entry. Read-only after construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    id: MessageId,
    role: Role,
    content: String,
    created_at: DateTime<Utc>,
    scope_file_id: Option<i64>,
    sources: Vec<Citation>,
}

impl Message {
    /// A question typed by the user. User messages never carry sources.
    pub fn user(id: MessageId, content: impl Into<String>, scope_file_id: Option<i64>) -> Self {
        Self {
            id,
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
            scope_file_id,
            sources: Vec::new(),
        }
    }

    /// An answer (or synthesized error explanation) from the assistant.
    pub fn assistant(
        id: MessageId,
        content: impl Into<String>,
        scope_file_id: Option<i64>,
        sources: Vec<Citation>,
    ) -> Self {
        Self {
            id,
            role: Role::Assistant,
            content: content.into(),
            created_at: Utc::now(),
            scope_file_id,
            sources,
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn scope_file_id(&self) -> Option<i64> {
        self.scope_file_id
    }

    pub fn sources(&self) -> &[Citation] {
        &self.sources
    }

    /// "1 source" / "N sources", or `None` without sources.
    pub fn source_label(&self) -> Option<String> {
        match self.sources.len() {
            0 => None,
            1 => Some("1 source".to_string()),
            n => Some(format!("{} sources", n)),
        }
    }
}

// =============================================================================
// Transcript
// =============================================================================

/// Ordered message log for one session.
#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    generation: u64,
    ids: MessageIdGenerator,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id for a message about to be appended.
    pub fn next_id(&mut self) -> MessageId {
        self.ids.next_id()
    }

    /// Add a message at the end. No deduplication or role checks.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Remove every message and start a new generation.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.generation += 1;
    }

    /// Incremented by every `clear`.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_strictly_increase() {
        let mut ids = MessageIdGenerator::new();
        let mut previous = ids.next_id();
        for _ in 0..1000 {
            let id = ids.next_id();
            assert!(id > previous);
            previous = id;
        }
    }

    #[test]
    fn test_append_preserves_insertion_order() {
        let mut transcript = Transcript::new();
        let first = transcript.next_id();
        let second = transcript.next_id();
        // Appended out of id order on purpose: order is insertion, not id.
        transcript.append(Message::user(second, "b", None));
        transcript.append(Message::user(first, "a", None));

        let contents: Vec<&str> = transcript.iter().map(|m| m.content()).collect();
        assert_eq!(contents, vec!["b", "a"]);
    }

    #[test]
    fn test_consecutive_same_role_allowed() {
        let mut transcript = Transcript::new();
        for _ in 0..2 {
            let id = transcript.next_id();
            transcript.append(Message::assistant(id, "error", None, vec![]));
        }
        assert_eq!(transcript.len(), 2);
        assert!(transcript.iter().all(|m| m.role() == Role::Assistant));
    }

    #[test]
    fn test_clear_empties_and_bumps_generation() {
        let mut transcript = Transcript::new();
        let id = transcript.next_id();
        transcript.append(Message::user(id, "hello", Some(1)));
        assert_eq!(transcript.generation(), 0);

        transcript.clear();
        assert!(transcript.is_empty());
        assert_eq!(transcript.generation(), 1);
        assert!(transcript.last().is_none());
    }

    #[test]
    fn test_ids_stay_unique_across_clear() {
        let mut transcript = Transcript::new();
        let before = transcript.next_id();
        transcript.clear();
        let after = transcript.next_id();
        assert!(after > before);
    }

    #[test]
    fn test_user_message_has_no_sources() {
        let msg = Message::user(MessageIdGenerator::new().next_id(), "q", Some(5));
        assert_eq!(msg.role(), Role::User);
        assert!(msg.sources().is_empty());
        assert_eq!(msg.scope_file_id(), Some(5));
        assert_eq!(msg.source_label(), None);
    }

    #[test]
    fn test_source_label_pluralisation() {
        let mut ids = MessageIdGenerator::new();
        let one = Message::assistant(ids.next_id(), "a", None, vec![Citation(json!({}))]);
        let three = Message::assistant(
            ids.next_id(),
            "a",
            None,
            vec![Citation(json!(1)), Citation(json!("x")), Citation(json!(null))],
        );
        assert_eq!(one.source_label().as_deref(), Some("1 source"));
        assert_eq!(three.source_label().as_deref(), Some("3 sources"));
    }

    #[test]
    fn test_role_display_and_serialization() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(serde_json::to_value(Role::Assistant).unwrap(), json!("assistant"));
    }
}
