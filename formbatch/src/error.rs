//! Error types for formbatch.
//!
//! Every component operation returns [`Result`], so failures cross component
//! boundaries as values and are turned into `{ok: false, message}` envelopes
//! by the entry points in [`crate::api`].
//!
//! # Error Categories
//!
//! - **Input errors**: nothing selected, malformed search query
//! - **Configuration errors**: missing sheet columns, invalid settings
//! - **Transient I/O errors**: a single file could not be read or moved
//! - **Service errors**: the merge endpoint failed or answered unexpectedly

use std::io;

/// Result type alias for formbatch operations.
pub type Result<T> = std::result::Result<T, FormBatchError>;

/// Main error type for formbatch operations.
#[derive(Debug, thiserror::Error)]
pub enum FormBatchError {
    /// The caller selected no files.
    #[error("No files selected.")]
    NoFilesSelected,

    /// None of the selected files could be staged.
    #[error("No eligible files under size cap.")]
    NoEligibleFiles,

    /// A search query could not be interpreted.
    #[error("Invalid search query: {message}")]
    InvalidQuery {
        /// What is wrong with the query.
        message: String,
    },

    /// A required header is absent from the tracking sheet.
    #[error("Missing {column} column in sheet.")]
    MissingColumn {
        /// Header name that was looked up.
        column: String,
    },

    /// The named sheet does not exist in the workbook.
    #[error("Sheet not found: {name}")]
    SheetNotFound {
        /// Sheet name that was requested.
        name: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong with the configuration.
        message: String,
    },

    /// A file identifier does not resolve in the document store.
    #[error("File not found: {id}")]
    FileNotFound {
        /// Identifier that was looked up.
        id: String,
    },

    /// The document store refused or failed an operation on a file.
    #[error("Storage operation failed for {id}: {reason}")]
    Storage {
        /// Identifier of the file involved.
        id: String,
        /// Reason for the failure.
        reason: String,
    },

    /// The spreadsheet adapter failed.
    #[error("Sheet operation failed: {reason}")]
    Sheet {
        /// Reason for the failure.
        reason: String,
    },

    /// The merge endpoint could not be reached.
    #[error("Merge service unreachable: {reason}")]
    MergeUnreachable {
        /// Transport-level failure description.
        reason: String,
    },

    /// The merge endpoint answered with a non-2xx status.
    #[error("Merge error {status}: {preview}")]
    MergeHttp {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        preview: String,
    },

    /// The merge endpoint answered 2xx with something that is not a PDF.
    #[error("Unexpected merge response type.")]
    UnexpectedMergeResponse,

    /// The merge response could not be parsed.
    #[error("Merge parse error: {reason}")]
    MergeParse {
        /// Parser failure description.
        reason: String,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON (de)serialization error outside the merge response path.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FormBatchError {
    /// Create a MissingColumn error.
    pub fn missing_column(column: impl Into<String>) -> Self {
        Self::MissingColumn {
            column: column.into(),
        }
    }

    /// Create a Storage error.
    pub fn storage(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Storage {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Create a Sheet error.
    pub fn sheet(reason: impl Into<String>) -> Self {
        Self::Sheet {
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an InvalidQuery error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Check if this error only affects a single file.
    ///
    /// Transient errors are logged and the batch continues without the file.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::FileNotFound { .. } | Self::Storage { .. } | Self::Io(_)
        )
    }

    /// Check if this error should stop the whole operation before anything
    /// is mutated.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoFilesSelected
                | Self::NoEligibleFiles
                | Self::InvalidQuery { .. }
                | Self::MissingColumn { .. }
                | Self::SheetNotFound { .. }
                | Self::InvalidConfig { .. }
                | Self::MergeUnreachable { .. }
                | Self::MergeHttp { .. }
                | Self::UnexpectedMergeResponse
                | Self::MergeParse { .. }
        )
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoFilesSelected | Self::NoEligibleFiles | Self::InvalidQuery { .. } => 1,
            Self::MissingColumn { .. }
            | Self::SheetNotFound { .. }
            | Self::InvalidConfig { .. } => 2,
            Self::FileNotFound { .. } | Self::Storage { .. } | Self::Io(_) => 3,
            Self::Sheet { .. } | Self::Json(_) => 4,
            Self::MergeUnreachable { .. }
            | Self::MergeHttp { .. }
            | Self::UnexpectedMergeResponse
            | Self::MergeParse { .. } => 5,
        }
    }
}
