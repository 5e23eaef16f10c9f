//! Merge-and-archive orchestration.
//!
//! A merge run goes through four phases, in order:
//!
//! 1. **Resolve**: open the tracking sheet and locate the form id and
//!    "Printed At" columns. A missing column aborts before any file is
//!    touched.
//! 2. **Stage**: re-validate every requested file and read it into a
//!    [`MergePayload`] until a cap is reached. Unreadable or ineligible files
//!    are skipped.
//! 3. **Merge**: send the payload to the [`MergeService`]. A failure here
//!    aborts the run with nothing moved.
//! 4. **Archive and mark**: move each staged file to the archive folder and
//!    stamp "Printed At" on the rows of the form ids that moved. A failed move
//!    leaves that one file in staging.
//!
//! There is no rollback: if marking fails after files were archived, the run
//! still reports success and the sheet stays stale for those rows.

use std::collections::HashSet;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{FormBatchError, Result};
use crate::form_id::FormId;
use crate::merge::{CapacityExceeded, MergePayload, MergeService, MergedDocument, StagedFile};
use crate::scanner::{CandidateFile, Scanner};
use crate::search::{self, RecreateRow, SearchQuery};
use crate::sheet::{Cell, Sheet, SheetProvider, require_column};
use crate::store::{DocumentStore, FileHandle};

/// Result of the archive step for one staged file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// The file moved to the archive folder.
    Archived {
        /// Store identifier.
        id: String,
        /// Form id parsed from the file name, if any.
        form_id: Option<FormId>,
    },
    /// The move failed; the file is still in staging.
    Failed {
        /// Store identifier.
        id: String,
        /// Why the move failed.
        reason: String,
    },
}

impl ArchiveOutcome {
    /// Identifier of the file this outcome is about.
    pub fn id(&self) -> &str {
        match self {
            Self::Archived { id, .. } | Self::Failed { id, .. } => id,
        }
    }

    /// Whether the file was archived.
    pub fn is_archived(&self) -> bool {
        matches!(self, Self::Archived { .. })
    }
}

/// Successful outcome of a merge run.
#[derive(Debug, Clone)]
pub struct MergeReport {
    /// The merged PDF.
    pub document: MergedDocument,
    /// Identifiers that were moved to the archive folder, in staging order.
    pub archived_ids: Vec<String>,
    /// Number of files sent to the merge service.
    pub count_merged: usize,
    /// Per-file archive results, in staging order.
    pub outcomes: Vec<ArchiveOutcome>,
    /// Requested identifiers that were not staged.
    pub skipped_ids: Vec<String>,
    /// Number of sheet rows stamped with "Printed At".
    pub rows_marked: usize,
}

/// Files that made it into the payload, with their store handles.
struct Staged {
    payload: MergePayload,
    files: Vec<FileHandle>,
}

/// Entry point for listing, merging and searching.
///
/// Holds the configuration and the three external collaborators. Each
/// operation runs its steps sequentially to completion.
#[derive(Clone)]
pub struct Orchestrator {
    config: Config,
    store: Arc<dyn DocumentStore>,
    sheets: Arc<dyn SheetProvider>,
    merger: Arc<dyn MergeService>,
}

impl Orchestrator {
    /// Creates an orchestrator.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration does not validate.
    pub fn new(
        config: Config,
        store: Arc<dyn DocumentStore>,
        sheets: Arc<dyn SheetProvider>,
        merger: Arc<dyn MergeService>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            sheets,
            merger,
        })
    }

    /// The configuration in use.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lists the PDFs waiting in staging, oldest first.
    pub async fn list_new_forms(&self) -> Result<Vec<CandidateFile>> {
        Scanner::new(self.store.as_ref(), &self.config)
            .candidates()
            .await
    }

    /// Searches the tracking sheet for rows whose document was generated.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<RecreateRow>> {
        search::search_forms(self.sheets.as_ref(), &self.config, query).await
    }

    /// Merges the selected files, archives them and marks them printed.
    ///
    /// # Errors
    ///
    /// - `NoFilesSelected` if `file_ids` is empty
    /// - `MissingColumn` / `SheetNotFound` if the tracking sheet is unusable
    /// - `NoEligibleFiles` if nothing could be staged
    /// - any merge service error, returned unchanged
    pub async fn merge_and_archive(&self, file_ids: &[String]) -> Result<MergeReport> {
        if file_ids.is_empty() {
            return Err(FormBatchError::NoFilesSelected);
        }

        let sheet = self
            .sheets
            .open_sheet(&self.config.sheet_id, &self.config.sheet_name)
            .await?;
        let headers = sheet.headers().await?;
        let form_id_column = require_column(&headers, &self.config.form_id_column)?;
        let printed_at_column = require_column(&headers, &self.config.printed_at_column)?;

        let Staged { payload, files } = self.stage(file_ids).await;
        if payload.is_empty() {
            return Err(FormBatchError::NoEligibleFiles);
        }

        let staged_ids: HashSet<&str> = files.iter().map(|f| f.id.as_str()).collect();
        let skipped_ids: Vec<String> = file_ids
            .iter()
            .filter(|id| !staged_ids.contains(id.as_str()))
            .cloned()
            .collect();

        tracing::info!(
            files = payload.len(),
            bytes = payload.total_bytes(),
            skipped = skipped_ids.len(),
            "staged files for merge"
        );

        let document = self.merger.merge(&payload).await.inspect_err(|err| {
            tracing::warn!(error = %err, "merge failed, nothing archived");
        })?;

        let outcomes = self.archive(&files).await;
        let archived_ids: Vec<String> = outcomes
            .iter()
            .filter(|outcome| outcome.is_archived())
            .map(|outcome| outcome.id().to_string())
            .collect();

        let printed: HashSet<FormId> = outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                ArchiveOutcome::Archived {
                    form_id: Some(form_id),
                    ..
                } => Some(form_id.clone()),
                _ => None,
            })
            .collect();

        let rows_marked = if printed.is_empty() {
            0
        } else {
            match self
                .mark_printed(sheet.as_ref(), form_id_column, printed_at_column, &printed)
                .await
            {
                Ok(rows) => {
                    tracing::info!(forms = printed.len(), rows, "updated Printed At");
                    rows
                }
                Err(err) => {
                    tracing::error!(
                        error = %err,
                        archived = archived_ids.len(),
                        "files archived but Printed At was not updated"
                    );
                    0
                }
            }
        };

        Ok(MergeReport {
            document,
            archived_ids,
            count_merged: payload.len(),
            outcomes,
            skipped_ids,
            rows_marked,
        })
    }

    /// Reads eligible files into a payload, stopping at the first file that
    /// would break the byte cap.
    async fn stage(&self, file_ids: &[String]) -> Staged {
        let scanner = Scanner::new(self.store.as_ref(), &self.config);
        let mut payload = MergePayload::new(self.config.max_files, self.config.max_total_bytes);
        let mut files = Vec::new();

        for id in file_ids.iter().take(self.config.max_files) {
            let file = match self.store.get_file(id).await {
                Ok(file) => file,
                Err(FormBatchError::FileNotFound { .. }) => {
                    tracing::debug!(id = %id, "skipping unknown file");
                    continue;
                }
                Err(err) => {
                    tracing::warn!(id = %id, error = %err, "skipping file (read error)");
                    continue;
                }
            };

            if !scanner.is_eligible(&file) {
                tracing::debug!(id = %id, name = %file.name, "skipping ineligible file");
                continue;
            }

            let bytes = match self.store.read_bytes(&file).await {
                Ok(bytes) => bytes,
                Err(err) => {
                    tracing::warn!(id = %id, error = %err, "skipping file (read error)");
                    continue;
                }
            };

            let staged = StagedFile {
                id: file.id.clone(),
                name: file.name.clone(),
                bytes,
            };
            match payload.try_push(staged) {
                Ok(()) => files.push(file),
                Err(CapacityExceeded::Bytes) => {
                    tracing::info!(
                        id = %id,
                        limit = self.config.max_total_bytes,
                        "byte cap reached, staging stopped"
                    );
                    break;
                }
                Err(CapacityExceeded::Count) => break,
            }
        }

        Staged { payload, files }
    }

    /// Moves every staged file from staging to archive.
    async fn archive(&self, files: &[FileHandle]) -> Vec<ArchiveOutcome> {
        let mut outcomes = Vec::with_capacity(files.len());

        for file in files {
            let moved = self
                .store
                .move_file(
                    file,
                    &self.config.staging_folder_id,
                    &self.config.archive_folder_id,
                )
                .await;

            match moved {
                Ok(()) => {
                    let form_id = FormId::from_file_name(&file.name);
                    if form_id.is_none() {
                        tracing::warn!(name = %file.name, "no FormID found in file name");
                    }
                    outcomes.push(ArchiveOutcome::Archived {
                        id: file.id.clone(),
                        form_id,
                    });
                }
                Err(err) => {
                    tracing::warn!(id = %file.id, error = %err, "archive move failed");
                    outcomes.push(ArchiveOutcome::Failed {
                        id: file.id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        outcomes
    }

    /// Rewrites the "Printed At" column in one bulk write.
    ///
    /// Rows whose form id was printed get the current time; every other row
    /// keeps the value read just before the write.
    async fn mark_printed(
        &self,
        sheet: &dyn Sheet,
        form_id_column: usize,
        printed_at_column: usize,
        printed: &HashSet<FormId>,
    ) -> Result<usize> {
        let last_row = sheet.last_row().await?;
        if last_row < 2 {
            return Ok(0);
        }
        let count = last_row - 1;

        let form_ids = sheet.read_column(form_id_column, 2, count).await?;
        let existing = sheet.read_column(printed_at_column, 2, count).await?;
        let now = Cell::date(self.config.now().naive_local());
        let printed: HashSet<&str> = printed.iter().map(FormId::as_str).collect();

        let mut marked = 0;
        let updates: Vec<Cell> = form_ids
            .iter()
            .zip(existing)
            .map(|(form_id, current)| {
                let text = form_id.to_text();
                if printed.contains(text.trim()) {
                    marked += 1;
                    now.clone()
                } else {
                    current
                }
            })
            .collect();

        sheet.write_column(printed_at_column, 2, updates).await?;
        Ok(marked)
    }
}
