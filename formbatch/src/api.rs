//! JSON-shaped entry points.
//!
//! Each public operation answers with an envelope: `{"ok": true, ...}` with
//! the operation's fields flattened in, or `{"ok": false, "message": ...}`.
//! No error escapes these functions.

use serde::Serialize;
use serde_json::Value;

use crate::error::{FormBatchError, Result};
use crate::orchestrator::{MergeReport, Orchestrator};
use crate::scanner::CandidateFile;
use crate::search::{RecreateRow, SearchQuery};

const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply<T> {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// Operation fields, present on success.
    #[serde(flatten)]
    pub body: Option<T>,
    /// Failure message, present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Reply<T> {
    /// A successful reply.
    pub fn success(body: T) -> Self {
        Self {
            ok: true,
            body: Some(body),
            message: None,
        }
    }

    /// A failed reply.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            body: None,
            message: Some(message.into()),
        }
    }
}

impl<T> From<Result<T>> for Reply<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(body) => Self::success(body),
            Err(err) => Self::failure(err.to_string()),
        }
    }
}

/// One staged form in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedForm {
    /// Store identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Creation time, `YYYY-MM-DD HH:MM` in the configured offset.
    pub created: String,
}

/// Body of [`list_new_forms`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormList {
    /// Forms waiting in staging, oldest first.
    pub files: Vec<ListedForm>,
    /// Number of forms.
    pub count: usize,
}

/// Body of [`get_merged_pdf_and_archive`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeSummary {
    /// Merged PDF, base64-encoded.
    pub base64: String,
    /// Identifiers moved to the archive folder.
    pub archived_ids: Vec<String>,
    /// Number of files sent to the merge service.
    pub count_merged: usize,
}

impl From<MergeReport> for MergeSummary {
    fn from(report: MergeReport) -> Self {
        Self {
            base64: report.document.into_base64(),
            archived_ids: report.archived_ids,
            count_merged: report.count_merged,
        }
    }
}

/// Body of [`search_forms_for_recreate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResults {
    /// Matching rows, newest first.
    pub rows: Vec<RecreateRow>,
}

fn log_failure<T>(operation: &str, result: &Result<T>) {
    if let Err(err) = result {
        tracing::warn!(operation, error = %err, "request failed");
    }
}

/// Lists the PDFs waiting in staging.
pub async fn list_new_forms(orchestrator: &Orchestrator) -> Reply<FormList> {
    let offset = match orchestrator.config().offset() {
        Ok(offset) => offset,
        Err(err) => return Reply::failure(err.to_string()),
    };

    let result = orchestrator.list_new_forms().await.map(|candidates| {
        let files: Vec<ListedForm> = candidates
            .into_iter()
            .map(|CandidateFile { id, name, size, created_at, .. }| ListedForm {
                id,
                name,
                size,
                created: created_at
                    .with_timezone(&offset)
                    .format(CREATED_FORMAT)
                    .to_string(),
            })
            .collect();
        FormList {
            count: files.len(),
            files,
        }
    });
    log_failure("list_new_forms", &result);
    result.into()
}

/// Merges the selected files, archives them and marks them printed.
pub async fn get_merged_pdf_and_archive(
    orchestrator: &Orchestrator,
    file_ids: &[String],
) -> Reply<MergeSummary> {
    let result = orchestrator
        .merge_and_archive(file_ids)
        .await
        .map(MergeSummary::from);
    log_failure("get_merged_pdf_and_archive", &result);
    result.into()
}

/// Searches the tracking sheet for forms that can be recreated.
pub async fn search_forms_for_recreate(
    orchestrator: &Orchestrator,
    query: &SearchQuery,
) -> Reply<SearchResults> {
    let result = orchestrator
        .search(query)
        .await
        .map(|rows| SearchResults { rows });
    log_failure("search_forms_for_recreate", &result);
    result.into()
}

/// Reads a file selection sent as JSON.
///
/// The value must be a non-empty array. Strings are taken as-is and numbers
/// are converted to their decimal text; any other element is rejected.
pub fn file_ids_from_json(value: &Value) -> Result<Vec<String>> {
    let Some(items) = value.as_array().filter(|items| !items.is_empty()) else {
        return Err(FormBatchError::NoFilesSelected);
    };

    items
        .iter()
        .map(|item| match item {
            Value::String(id) => Ok(id.clone()),
            Value::Number(id) => Ok(id.to_string()),
            other => Err(FormBatchError::invalid_query(format!(
                "file id must be a string, got {other}"
            ))),
        })
        .collect()
}
