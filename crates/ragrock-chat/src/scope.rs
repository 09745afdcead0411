//! Query scope: which documents a turn searches and how.
//!
//! `ScopeState` is the editable input state (selected document, raw keyword
//! text, result count). `snapshot` freezes it into a `ChatScope` at
//! submission time.

/// Result count used until the user sets a valid one.
pub const DEFAULT_K: u32 = 4;
/// Smallest accepted result count.
pub const MIN_K: u32 = 1;
/// Largest accepted result count.
pub const MAX_K: u32 = 20;

/// Retrieval scope of a single chat turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatScope {
    /// Document to search, or `None` for all documents.
    pub file_id: Option<i64>,
    /// Keyword filter. Never `Some` of an empty list.
    pub keywords: Option<Vec<String>>,
    /// Number of results to retrieve.
    pub k: u32,
}

impl Default for ChatScope {
    fn default() -> Self {
        Self {
            file_id: None,
            keywords: None,
            k: DEFAULT_K,
        }
    }
}

/// Split a comma-separated keyword field.
///
/// Tokens are trimmed and blanks dropped, keeping input order. Returns `None`
/// when nothing is left, so "no filter" is never sent as an empty list.
pub fn parse_keywords(raw: &str) -> Option<Vec<String>> {
    let keywords: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect();

    if keywords.is_empty() {
        None
    } else {
        Some(keywords)
    }
}

/// Parse a result count, keeping `last_good` when the input is unusable.
///
/// Non-numeric and non-positive input fall back to `last_good`; values
/// above `MAX_K` are clamped.
pub fn parse_k(raw: &str, last_good: u32) -> u32 {
    match raw.trim().parse::<i64>() {
        Ok(value) if value > 0 => value.min(i64::from(MAX_K)) as u32,
        _ => last_good,
    }
}

/// Editable scope inputs for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeState {
    selected_file_id: Option<i64>,
    keyword_text: String,
    k: u32,
}

impl Default for ScopeState {
    fn default() -> Self {
        Self::new(DEFAULT_K)
    }
}

impl ScopeState {
    /// Create an unscoped state with the given initial result count.
    pub fn new(initial_k: u32) -> Self {
        Self {
            selected_file_id: None,
            keyword_text: String::new(),
            k: initial_k.clamp(MIN_K, MAX_K),
        }
    }

    pub fn selected_file_id(&self) -> Option<i64> {
        self.selected_file_id
    }

    pub fn keyword_text(&self) -> &str {
        &self.keyword_text
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    /// Scope subsequent turns to one document, or to all with `None`.
    pub fn select(&mut self, file_id: Option<i64>) {
        self.selected_file_id = file_id;
    }

    pub fn clear_selection(&mut self) {
        self.selected_file_id = None;
    }

    /// Replace the raw keyword field.
    pub fn set_keywords(&mut self, raw: impl Into<String>) {
        self.keyword_text = raw.into();
    }

    /// Apply raw result-count input and return the effective value.
    pub fn set_k_input(&mut self, raw: &str) -> u32 {
        self.k = parse_k(raw, self.k);
        self.k
    }

    /// Freeze the current inputs into a `ChatScope`.
    pub fn snapshot(&self) -> ChatScope {
        ChatScope {
            file_id: self.selected_file_id,
            keywords: parse_keywords(&self.keyword_text),
            k: self.k,
        }
    }
}
