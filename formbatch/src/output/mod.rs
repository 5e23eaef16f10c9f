//! Output formatting and display for formbatch.
//!
//! This module handles human-facing output of the CLI:
//! - Formatted status messages
//! - Listings of staged forms
//! - Merge run summaries
//! - Search result tables
//!
//! # Examples
//!
//! ```
//! use formbatch::output::{OutputFormatter, format_file_size};
//!
//! let formatter = OutputFormatter::new(false, false);
//! formatter.info(&format!("Payload: {}", format_file_size(2048)));
//! ```

pub mod formatter;

pub use formatter::OutputFormatter;

use chrono::FixedOffset;

use crate::orchestrator::{ArchiveOutcome, MergeReport};
use crate::scanner::CandidateFile;
use crate::search::RecreateRow;

/// Display the forms waiting in staging.
pub fn display_candidates(
    formatter: &OutputFormatter,
    candidates: &[CandidateFile],
    offset: FixedOffset,
) {
    if candidates.is_empty() {
        formatter.info("No new forms in staging.");
        return;
    }

    formatter.section(&format!("{} new form(s):", candidates.len()));
    for (index, candidate) in candidates.iter().enumerate() {
        let created = candidate.created_at.with_timezone(&offset);
        formatter.list_item(
            index + 1,
            &format!(
                "{}  {}  {}  [{}]",
                candidate.name,
                format_file_size(candidate.size),
                created.format("%Y-%m-%d %H:%M"),
                candidate.id
            ),
        );
        if let Some(form_id) = &candidate.form_id {
            formatter.detail("FormID", form_id.as_str());
        }
    }
}

/// Display the outcome of a merge run.
pub fn display_merge_report(formatter: &OutputFormatter, report: &MergeReport) {
    formatter.success(&format!(
        "Merged {} file(s), archived {}",
        report.count_merged,
        report.archived_ids.len()
    ));

    for outcome in &report.outcomes {
        match outcome {
            ArchiveOutcome::Archived { id, form_id } => formatter.detail(
                "Archived",
                &match form_id {
                    Some(form_id) => format!("{id} (FormID {form_id})"),
                    None => format!("{id} (no FormID)"),
                },
            ),
            ArchiveOutcome::Failed { id, reason } => {
                formatter.warning(&format!("{id} left in staging: {reason}"));
            }
        }
    }

    if !report.skipped_ids.is_empty() {
        formatter.warning(&format!(
            "{} selected file(s) were not merged: {}",
            report.skipped_ids.len(),
            report.skipped_ids.join(", ")
        ));
    }

    formatter.info(&format!("Marked {} sheet row(s) as printed", report.rows_marked));
}

/// Display search results as a table.
pub fn display_search_results(formatter: &OutputFormatter, rows: &[RecreateRow]) {
    if rows.is_empty() {
        formatter.info("No matching forms.");
        return;
    }

    formatter.section(&format!("{} matching form(s):", rows.len()));
    formatter.table_row(&["Submitted", "Name", "Generated", "FormID"]);
    for row in rows {
        formatter.table_row(&[
            row.timestamp.as_str(),
            row.name.as_str(),
            row.generated_at.as_str(),
            row.form_id.as_str(),
        ]);
    }
}

/// Human-readable byte size.
pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{size} bytes")
    }
}
