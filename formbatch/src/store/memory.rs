//! In-memory document store with operation recording.
//!
//! Every call is recorded so tests can assert on exactly which files were
//! touched, and read or move failures can be injected per file.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{DocumentStore, FileHandle, PDF_MIME_TYPE};
use crate::error::{FormBatchError, Result};

/// Record of a store operation for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// Folder listing.
    List {
        /// Folder that was listed.
        folder_id: String,
    },
    /// File lookup.
    Get {
        /// Identifier that was resolved.
        id: String,
    },
    /// Content read.
    Read {
        /// Identifier that was read.
        id: String,
    },
    /// Folder move.
    Move {
        /// Identifier that was moved.
        id: String,
        /// Source folder.
        from: String,
        /// Destination folder.
        to: String,
    },
}

#[derive(Debug, Clone)]
struct StoredFile {
    handle: FileHandle,
    bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct State {
    files: Vec<StoredFile>,
    operations: Vec<StoreOp>,
    failing_reads: HashSet<String>,
    failing_moves: HashSet<String>,
}

/// In-memory [`DocumentStore`].
///
/// Files are listed in insertion order. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means a test panicked mid-operation.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds a PDF file to the given folders.
    pub fn add_pdf(
        &self,
        id: &str,
        name: &str,
        bytes: Vec<u8>,
        created_at: DateTime<Utc>,
        folders: &[&str],
    ) {
        self.add_file(id, name, PDF_MIME_TYPE, bytes, created_at, folders);
    }

    /// Adds a file with an arbitrary MIME type to the given folders.
    pub fn add_file(
        &self,
        id: &str,
        name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
        created_at: DateTime<Utc>,
        folders: &[&str],
    ) {
        let handle = FileHandle {
            id: id.to_string(),
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            size: bytes.len() as u64,
            created_at,
            parent_ids: folders.iter().map(|f| f.to_string()).collect(),
        };
        let mut state = self.state();
        state.files.retain(|f| f.handle.id != id);
        state.files.push(StoredFile { handle, bytes });
    }

    /// Makes every read of `id` fail.
    pub fn fail_reads(&self, id: &str) {
        self.state().failing_reads.insert(id.to_string());
    }

    /// Makes every move of `id` fail.
    pub fn fail_moves(&self, id: &str) {
        self.state().failing_moves.insert(id.to_string());
    }

    /// Returns all recorded operations.
    pub fn operations(&self) -> Vec<StoreOp> {
        self.state().operations.clone()
    }

    /// Returns the folders a file currently belongs to.
    pub fn parents_of(&self, id: &str) -> Vec<String> {
        self.state()
            .files
            .iter()
            .find(|f| f.handle.id == id)
            .map(|f| f.handle.parent_ids.clone())
            .unwrap_or_default()
    }

    /// Number of recorded moves.
    pub fn move_count(&self) -> usize {
        self.state()
            .operations
            .iter()
            .filter(|op| matches!(op, StoreOp::Move { .. }))
            .count()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_files(&self, folder_id: &str) -> Result<Vec<FileHandle>> {
        let mut state = self.state();
        state.operations.push(StoreOp::List {
            folder_id: folder_id.to_string(),
        });
        Ok(state
            .files
            .iter()
            .filter(|f| f.handle.parent_ids.iter().any(|p| p == folder_id))
            .map(|f| f.handle.clone())
            .collect())
    }

    async fn get_file(&self, id: &str) -> Result<FileHandle> {
        let mut state = self.state();
        state.operations.push(StoreOp::Get { id: id.to_string() });
        state
            .files
            .iter()
            .find(|f| f.handle.id == id)
            .map(|f| f.handle.clone())
            .ok_or_else(|| FormBatchError::FileNotFound { id: id.to_string() })
    }

    async fn read_bytes(&self, file: &FileHandle) -> Result<Vec<u8>> {
        let mut state = self.state();
        state.operations.push(StoreOp::Read {
            id: file.id.clone(),
        });
        if state.failing_reads.contains(&file.id) {
            return Err(FormBatchError::storage(&file.id, "injected read failure"));
        }
        state
            .files
            .iter()
            .find(|f| f.handle.id == file.id)
            .map(|f| f.bytes.clone())
            .ok_or_else(|| FormBatchError::FileNotFound {
                id: file.id.clone(),
            })
    }

    async fn move_file(
        &self,
        file: &FileHandle,
        from_folder: &str,
        to_folder: &str,
    ) -> Result<()> {
        let mut state = self.state();
        state.operations.push(StoreOp::Move {
            id: file.id.clone(),
            from: from_folder.to_string(),
            to: to_folder.to_string(),
        });
        if state.failing_moves.contains(&file.id) {
            return Err(FormBatchError::storage(&file.id, "injected move failure"));
        }

        let stored = state
            .files
            .iter_mut()
            .find(|f| f.handle.id == file.id)
            .ok_or_else(|| FormBatchError::FileNotFound {
                id: file.id.clone(),
            })?;

        let parents = &mut stored.handle.parent_ids;
        if !parents.iter().any(|p| p == to_folder) {
            parents.push(to_folder.to_string());
        }
        parents.retain(|p| p != from_folder);
        Ok(())
    }
}
