//! Configuration for formbatch.
//!
//! A [`Config`] is built once at process start (the CLI assembles it from
//! arguments and environment variables) and handed to every component by
//! reference. Nothing reads settings from global state.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{FormBatchError, Result};

/// Default cap on the number of files sent in one merge request.
pub const DEFAULT_MAX_FILES: usize = 250;

/// Default cap on the cumulative size of a merge request (~45 MB).
pub const DEFAULT_MAX_TOTAL_BYTES: u64 = 45 * 1024 * 1024;

/// Default name of the tracking sheet inside the workbook.
pub const DEFAULT_SHEET_NAME: &str = "Form Responses 1";

/// Default header of the tracking column stamped after archiving.
pub const DEFAULT_PRINTED_AT_COLUMN: &str = "Printed At";

/// Default header of the form identifier column.
pub const DEFAULT_FORM_ID_COLUMN: &str = "FormID";

/// Default merge request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Complete configuration for listing, merging and searching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Folder holding newly completed forms.
    pub staging_folder_id: String,

    /// Folder receiving originals after a successful merge.
    pub archive_folder_id: String,

    /// Base URL of the merge service (without the `/merge` path).
    pub merge_service_url: String,

    /// Identifier of the workbook holding the tracking sheet.
    pub sheet_id: String,

    /// Name of the tracking sheet.
    pub sheet_name: String,

    /// Maximum number of files staged per merge.
    pub max_files: usize,

    /// Maximum cumulative bytes staged per merge.
    pub max_total_bytes: u64,

    /// Header of the column stamped after archiving.
    pub printed_at_column: String,

    /// Header of the form identifier column.
    pub form_id_column: String,

    /// Merge request timeout in seconds.
    pub timeout_secs: u64,

    /// Offset from UTC used for every formatted timestamp, in minutes.
    pub utc_offset_minutes: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            staging_folder_id: String::new(),
            archive_folder_id: String::new(),
            merge_service_url: String::new(),
            sheet_id: String::new(),
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            max_files: DEFAULT_MAX_FILES,
            max_total_bytes: DEFAULT_MAX_TOTAL_BYTES,
            printed_at_column: DEFAULT_PRINTED_AT_COLUMN.to_string(),
            form_id_column: DEFAULT_FORM_ID_COLUMN.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            utc_offset_minutes: 0,
        }
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FormBatchError::InvalidConfig`] if:
    /// - a folder, sheet or service identifier is empty
    /// - staging and archive are the same folder
    /// - either cap is zero
    /// - the UTC offset is out of range
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("staging folder", &self.staging_folder_id),
            ("archive folder", &self.archive_folder_id),
            ("merge service URL", &self.merge_service_url),
            ("sheet id", &self.sheet_id),
            ("sheet name", &self.sheet_name),
            ("Printed At column", &self.printed_at_column),
            ("FormID column", &self.form_id_column),
        ];
        for (what, value) in required {
            if value.trim().is_empty() {
                return Err(FormBatchError::invalid_config(format!("{what} is empty")));
            }
        }

        if self.staging_folder_id == self.archive_folder_id {
            return Err(FormBatchError::invalid_config(
                "staging and archive folders must differ",
            ));
        }

        if self.max_files == 0 {
            return Err(FormBatchError::invalid_config("max files must be at least 1"));
        }

        if self.max_total_bytes == 0 {
            return Err(FormBatchError::invalid_config(
                "max total bytes must be at least 1",
            ));
        }

        if self.timeout_secs == 0 {
            return Err(FormBatchError::invalid_config(
                "timeout must be at least 1 second",
            ));
        }

        self.offset()?;
        Ok(())
    }

    /// The configured offset from UTC.
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            FormBatchError::invalid_config(format!(
                "UTC offset out of range: {} minutes",
                self.utc_offset_minutes
            ))
        })
    }

    /// Current time in the configured offset.
    ///
    /// Falls back to UTC when the offset is invalid; [`Config::validate`]
    /// rejects such configurations up front.
    pub fn now(&self) -> DateTime<FixedOffset> {
        let offset = self.offset().unwrap_or_else(|_| Utc.fix());
        Utc::now().with_timezone(&offset)
    }

    /// Merge request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
