//! CLI argument parsing for formbatch.
//!
//! Every global option can also be set through a `FORMBATCH_*` environment
//! variable, and a JSON configuration file can supply the library settings.
//! Precedence, lowest first: library defaults, `--config` file, environment,
//! command line.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use formbatch::config::Config;
use formbatch::error::{FormBatchError, Result};
use formbatch::search::SearchQuery;

/// Staging folder used when none is configured.
pub const DEFAULT_STAGING_FOLDER: &str = "completed";

/// Archive folder used when none is configured.
pub const DEFAULT_ARCHIVE_FOLDER: &str = "archive";

/// Merge completed PDF forms and keep their tracking sheet current.
///
/// formbatch lists the PDFs waiting in a staging folder, sends a selection to
/// a merge service, moves the originals to an archive folder and stamps
/// "Printed At" on their rows in the tracking sheet.
#[derive(Parser, Debug)]
#[command(name = "formbatch")]
#[command(version)]
#[command(about = "Merge completed PDF forms and archive the originals", long_about = None)]
#[command(author)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Operation to run
    #[command(subcommand)]
    pub command: Command,

    /// JSON configuration file
    ///
    /// Uses the camelCase field names of the library configuration, e.g.
    /// {"mergeServiceUrl": "...", "maxFiles": 100}.
    #[arg(short, long, global = true, env = "FORMBATCH_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory whose subdirectories are the document folders
    #[arg(long, global = true, env = "FORMBATCH_STORE_ROOT", value_name = "DIR")]
    pub store_root: Option<PathBuf>,

    /// Folder holding completed forms
    #[arg(long, global = true, env = "FORMBATCH_STAGING_FOLDER", value_name = "NAME")]
    pub staging_folder: Option<String>,

    /// Folder receiving merged originals
    #[arg(long, global = true, env = "FORMBATCH_ARCHIVE_FOLDER", value_name = "NAME")]
    pub archive_folder: Option<String>,

    /// JSON workbook holding the tracking sheet
    #[arg(long, global = true, env = "FORMBATCH_WORKBOOK", value_name = "FILE")]
    pub workbook: Option<PathBuf>,

    /// Name of the tracking sheet inside the workbook
    #[arg(long, global = true, env = "FORMBATCH_SHEET_NAME", value_name = "NAME")]
    pub sheet_name: Option<String>,

    /// Base URL of the merge service
    #[arg(long, global = true, env = "FORMBATCH_MERGE_URL", value_name = "URL")]
    pub merge_url: Option<String>,

    /// Maximum number of files per merge
    #[arg(long, global = true, env = "FORMBATCH_MAX_FILES", value_name = "N")]
    pub max_files: Option<usize>,

    /// Maximum cumulative size of the files per merge, in bytes
    #[arg(long, global = true, env = "FORMBATCH_MAX_TOTAL_BYTES", value_name = "BYTES")]
    pub max_total_bytes: Option<u64>,

    /// Merge request timeout in seconds
    #[arg(long, global = true, env = "FORMBATCH_TIMEOUT_SECS", value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Offset from UTC for timestamps, in minutes (e.g. -300)
    #[arg(
        long,
        global = true,
        env = "FORMBATCH_UTC_OFFSET",
        value_name = "MINUTES",
        allow_hyphen_values = true
    )]
    pub utc_offset: Option<i32>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the PDFs waiting in the staging folder, oldest first
    List(ListArgs),

    /// Merge selected forms, archive them and mark them printed
    Merge(MergeArgs),

    /// Search the tracking sheet for forms that can be recreated
    Search(SearchArgs),
}

/// Arguments of `formbatch list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Print the JSON envelope instead of a listing
    #[arg(long)]
    pub json: bool,
}

/// Arguments of `formbatch merge`.
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Identifiers of the files to merge, in merge order
    #[arg(value_name = "ID")]
    pub ids: Vec<String>,

    /// Read additional identifiers from a JSON array file ('-' for stdin)
    #[arg(long, value_name = "FILE")]
    pub ids_from: Option<PathBuf>,

    /// Where to write the merged PDF (default: Merged_<timestamp>.pdf)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Overwrite the output file if it exists
    #[arg(short, long)]
    pub force: bool,

    /// Print the JSON envelope instead of a summary
    #[arg(long)]
    pub json: bool,
}

/// Arguments of `formbatch search`.
#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Earliest submission day (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub start: Option<String>,

    /// Latest submission day (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub end: Option<String>,

    /// Part of the first name
    #[arg(long, value_name = "TEXT")]
    pub first: Option<String>,

    /// Part of the last name
    #[arg(long, value_name = "TEXT")]
    pub last: Option<String>,

    /// Exact form id
    #[arg(long, value_name = "ID")]
    pub form_id: Option<String>,

    /// Print the JSON envelope instead of a table
    #[arg(long)]
    pub json: bool,
}

impl SearchArgs {
    /// The search query these arguments describe.
    pub fn to_query(&self) -> SearchQuery {
        SearchQuery {
            start: self.start.clone(),
            end: self.end.clone(),
            first: self.first.clone(),
            last: self.last.clone(),
            form_id: self.form_id.clone(),
        }
    }
}

impl Cli {
    /// Build the library configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed,
    /// or if the resulting configuration does not validate.
    pub fn to_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => serde_json::from_slice(&std::fs::read(path)?)?,
            None => Config::default(),
        };

        if let Some(folder) = &self.staging_folder {
            config.staging_folder_id = folder.clone();
        }
        if let Some(folder) = &self.archive_folder {
            config.archive_folder_id = folder.clone();
        }
        if let Some(workbook) = &self.workbook {
            config.sheet_id = workbook.display().to_string();
        }
        if let Some(name) = &self.sheet_name {
            config.sheet_name = name.clone();
        }
        if let Some(url) = &self.merge_url {
            config.merge_service_url = url.clone();
        }
        if let Some(max_files) = self.max_files {
            config.max_files = max_files;
        }
        if let Some(max_total_bytes) = self.max_total_bytes {
            config.max_total_bytes = max_total_bytes;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            config.timeout_secs = timeout_secs;
        }
        if let Some(offset) = self.utc_offset {
            config.utc_offset_minutes = offset;
        }

        if config.staging_folder_id.is_empty() {
            config.staging_folder_id = DEFAULT_STAGING_FOLDER.to_string();
        }
        if config.archive_folder_id.is_empty() {
            config.archive_folder_id = DEFAULT_ARCHIVE_FOLDER.to_string();
        }

        config.validate()?;
        Ok(config)
    }

    /// Root directory of the document store.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if no root was given.
    pub fn store_root(&self) -> Result<&Path> {
        self.store_root.as_deref().ok_or_else(|| {
            FormBatchError::invalid_config("store root is required (--store-root)")
        })
    }
}
