//! Document list cache and its effect on the chat scope.
//!
//! The library mirrors `GET /api/files` and keeps the scope selection
//! consistent with it: a deleted or vanished document is never left
//! selected, and uploads or an admin wipe reset the selection.

use std::sync::Arc;

use ragrock_core::backend::DocumentBackend;
use ragrock_core::types::{FileListItem, FileUploadResponse};

use crate::error::ChatError;
use crate::scope::ScopeState;

/// Cached list of the documents available for scoping.
pub struct DocumentLibrary<B> {
    backend: Arc<B>,
    files: Vec<FileListItem>,
}

impl<B: DocumentBackend> DocumentLibrary<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            files: Vec::new(),
        }
    }

    /// Documents in backend order.
    pub fn files(&self) -> &[FileListItem] {
        &self.files
    }

    pub fn find(&self, file_id: i64) -> Option<&FileListItem> {
        self.files.iter().find(|f| f.id == file_id)
    }

    /// The currently selected document, if it is still listed.
    pub fn selected<'a>(&'a self, scope: &ScopeState) -> Option<&'a FileListItem> {
        scope.selected_file_id().and_then(|id| self.find(id))
    }

    /// Reload the list from the backend.
    ///
    /// On failure the previous list is kept. A selection pointing at a
    /// document that is no longer listed is cleared.
    pub async fn refresh(&mut self, scope: &mut ScopeState) -> Result<&[FileListItem], ChatError> {
        let files = self.backend.list_files().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to load file list");
            ChatError::Backend(e.to_string())
        })?;

        tracing::debug!(count = files.len(), "File list refreshed");
        self.files = files;

        if let Some(id) = scope.selected_file_id() {
            if self.find(id).is_none() {
                tracing::info!(file_id = id, "Selected file no longer listed, clearing scope");
                scope.clear_selection();
            }
        }
        Ok(&self.files)
    }

    /// Scope chat to a listed document, or to all documents with `None`.
    pub fn select(&self, file_id: Option<i64>, scope: &mut ScopeState) -> Result<(), ChatError> {
        if let Some(id) = file_id {
            if self.find(id).is_none() {
                return Err(ChatError::UnknownFile(id));
            }
        }
        scope.select(file_id);
        Ok(())
    }

    /// Delete a document; clears the selection if it was the deleted one.
    pub async fn delete(&mut self, file_id: i64, scope: &mut ScopeState) -> Result<(), ChatError> {
        self.backend.delete_file(file_id).await.map_err(|e| {
            tracing::warn!(file_id, error = %e, "Failed to delete file");
            ChatError::Backend(e.to_string())
        })?;
        tracing::info!(file_id, "File deleted");

        if scope.selected_file_id() == Some(file_id) {
            scope.clear_selection();
        }
        self.files.retain(|f| f.id != file_id);

        if let Err(e) = self.refresh(scope).await {
            tracing::debug!(error = %e, "Refresh after delete failed, keeping local list");
        }
        Ok(())
    }

    /// React to a finished upload: reload the list and reset the scope.
    pub async fn on_uploaded(
        &mut self,
        uploaded: &FileUploadResponse,
        scope: &mut ScopeState,
    ) -> Result<(), ChatError> {
        tracing::info!(file_id = uploaded.id, filename = %uploaded.filename, "File uploaded");
        scope.clear_selection();
        self.refresh(scope).await.map(|_| ())
    }

    /// Forget every document, e.g. after an admin wipe.
    pub fn reset(&mut self, scope: &mut ScopeState) {
        self.files.clear();
        scope.clear_selection();
    }
}
