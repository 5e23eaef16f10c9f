//! formbatch - Merge completed PDF forms and keep their tracking sheet current.
//!
//! Completed submission PDFs land in a staging folder. This library lists
//! them, sends a selection to an external merge service, moves the originals
//! to an archive folder and stamps "Printed At" on their rows in a tracking
//! sheet. It also searches that sheet for submissions whose documents can be
//! recreated.
//!
//! The three collaborators sit behind traits so they can be swapped:
//!
//! - [`store::DocumentStore`]: folders of files ([`store::LocalFolderStore`],
//!   [`store::MemoryStore`])
//! - [`sheet::SheetProvider`]: the tracking workbook ([`sheet::JsonWorkbook`],
//!   [`sheet::MemoryWorkbook`])
//! - [`merge::MergeService`]: the merge endpoint ([`merge::HttpMergeClient`])
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use formbatch::{Config, Orchestrator};
//! use formbatch::merge::HttpMergeClient;
//! use formbatch::sheet::JsonWorkbook;
//! use formbatch::store::LocalFolderStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     staging_folder_id: "completed".to_string(),
//!     archive_folder_id: "archive".to_string(),
//!     merge_service_url: "https://merge.example.com".to_string(),
//!     sheet_id: "tracking.json".to_string(),
//!     ..Config::default()
//! };
//!
//! let orchestrator = Orchestrator::new(
//!     config.clone(),
//!     Arc::new(LocalFolderStore::new("/srv/forms")),
//!     Arc::new(JsonWorkbook::new()),
//!     Arc::new(HttpMergeClient::new(&config)?),
//! )?;
//!
//! let forms = orchestrator.list_new_forms().await?;
//! let ids: Vec<String> = forms.into_iter().map(|f| f.id).collect();
//! let report = orchestrator.merge_and_archive(&ids).await?;
//! println!("merged {} file(s)", report.count_merged);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod error;
pub mod form_id;
pub mod merge;
pub mod orchestrator;
pub mod output;
pub mod scanner;
pub mod search;
pub mod sheet;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use error::{FormBatchError, Result};
pub use form_id::FormId;
pub use orchestrator::{ArchiveOutcome, MergeReport, Orchestrator};
pub use search::{RecreateRow, SearchQuery};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
