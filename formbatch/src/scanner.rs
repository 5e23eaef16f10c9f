//! Eligibility scanning of the staging folder.
//!
//! A file is a merge candidate exactly when it is a PDF, it sits in the
//! staging folder, and it is not also in the archive folder. The same rule is
//! applied when listing and again when a merge re-validates the caller's
//! selection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Result;
use crate::form_id::FormId;
use crate::store::{DocumentStore, FileHandle};

/// A PDF waiting in staging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateFile {
    /// Store identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Form identifier parsed from the name, if any.
    pub form_id: Option<FormId>,
}

impl From<FileHandle> for CandidateFile {
    fn from(file: FileHandle) -> Self {
        let form_id = FormId::from_file_name(&file.name);
        Self {
            id: file.id,
            name: file.name,
            size: file.size,
            created_at: file.created_at,
            form_id,
        }
    }
}

/// Applies the eligibility rule against a store.
pub struct Scanner<'a> {
    store: &'a dyn DocumentStore,
    config: &'a Config,
}

impl<'a> Scanner<'a> {
    /// Creates a scanner over `store` using the folders in `config`.
    pub fn new(store: &'a dyn DocumentStore, config: &'a Config) -> Self {
        Self { store, config }
    }

    /// Whether `file` is a PDF in staging and not in archive.
    pub fn is_eligible(&self, file: &FileHandle) -> bool {
        file.is_pdf()
            && self.store.is_member_of(file, &self.config.staging_folder_id)
            && !self.store.is_member_of(file, &self.config.archive_folder_id)
    }

    /// Every eligible file in staging, oldest first.
    ///
    /// Files created at the same instant keep store order.
    pub async fn candidates(&self) -> Result<Vec<CandidateFile>> {
        let files = self
            .store
            .list_files(&self.config.staging_folder_id)
            .await?;
        let listed = files.len();

        let mut candidates: Vec<CandidateFile> = files
            .into_iter()
            .filter(|file| self.is_eligible(file))
            .map(CandidateFile::from)
            .collect();
        candidates.sort_by_key(|candidate| candidate.created_at);

        tracing::debug!(
            folder = %self.config.staging_folder_id,
            listed,
            eligible = candidates.len(),
            "scanned staging folder"
        );
        Ok(candidates)
    }
}
