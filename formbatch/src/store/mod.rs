//! Document store adapter.
//!
//! The store is the system of record for submitted PDFs. It knows about
//! folders, which files sit in which folder, and how to move a file from one
//! folder to another. The orchestrator only talks to it through
//! [`DocumentStore`].
//!
//! Two implementations ship with the crate:
//!
//! - [`LocalFolderStore`]: folders are subdirectories of a root directory
//! - [`MemoryStore`]: in-memory store with operation recording and failure
//!   injection, used by tests

pub mod local;
pub mod memory;

pub use local::LocalFolderStore;
pub use memory::{MemoryStore, StoreOp};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// MIME type of PDF documents.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Metadata of a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileHandle {
    /// Opaque store identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Declared MIME type.
    pub mime_type: String,

    /// Size in bytes.
    pub size: u64,

    /// Creation time.
    pub created_at: DateTime<Utc>,

    /// Identifiers of every folder the file currently belongs to.
    pub parent_ids: Vec<String>,
}

impl FileHandle {
    /// Whether the file is declared as a PDF.
    pub fn is_pdf(&self) -> bool {
        self.mime_type.eq_ignore_ascii_case(PDF_MIME_TYPE)
    }
}

/// Access to folders and files in a document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Lists the files directly inside a folder.
    async fn list_files(&self, folder_id: &str) -> Result<Vec<FileHandle>>;

    /// Resolves a file by identifier.
    ///
    /// Returns `FormBatchError::FileNotFound` if the identifier is unknown.
    async fn get_file(&self, id: &str) -> Result<FileHandle>;

    /// Reads the full content of a file.
    async fn read_bytes(&self, file: &FileHandle) -> Result<Vec<u8>>;

    /// Moves a file from one folder to another.
    ///
    /// The file is added to `to_folder` (unless it is already there) and then
    /// removed from `from_folder`. Moving a file that already sits only in
    /// `to_folder` is a no-op.
    async fn move_file(&self, file: &FileHandle, from_folder: &str, to_folder: &str)
    -> Result<()>;

    /// Whether the file belongs to the folder.
    fn is_member_of(&self, file: &FileHandle, folder_id: &str) -> bool {
        file.parent_ids.iter().any(|parent| parent == folder_id)
    }
}
