//! Workbooks stored as JSON files.
//!
//! The workbook identifier is the path of the file, which looks like:
//!
//! ```json
//! {
//!   "sheets": {
//!     "Form Responses 1": [
//!       ["Timestamp", "First Name", "Last Name", "FormID", "Printed At"],
//!       [{"date": "2025-10-30T18:19:00"}, "Jane", "Doe", "100000000254", null]
//!     ]
//!   }
//! }
//! ```
//!
//! Every write persists the whole workbook through a temporary file and a
//! rename, so a crash never leaves a half-written file behind.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

use super::{Cell, Grid, Sheet, SheetProvider};
use crate::error::{FormBatchError, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
struct WorkbookFile {
    sheets: BTreeMap<String, Grid>,
}

async fn load(path: &Path) -> Result<WorkbookFile> {
    let raw = fs::read(path).await.map_err(|err| {
        FormBatchError::sheet(format!("cannot read workbook {}: {err}", path.display()))
    })?;
    Ok(serde_json::from_slice(&raw)?)
}

async fn persist(path: &Path, workbook: &WorkbookFile) -> Result<()> {
    let data = serde_json::to_vec_pretty(workbook)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, data).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

/// [`SheetProvider`] reading JSON workbook files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonWorkbook;

impl JsonWorkbook {
    /// Creates the provider.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SheetProvider for JsonWorkbook {
    async fn open_sheet(&self, sheet_id: &str, name: &str) -> Result<Box<dyn Sheet>> {
        let sheet = JsonSheet {
            path: PathBuf::from(sheet_id),
            name: name.to_string(),
            lock: Mutex::new(()),
        };
        sheet.current().await?;
        Ok(Box::new(sheet))
    }
}

/// One sheet of a JSON workbook.
///
/// Every call reads the file as it is on disk at that moment. Writes only
/// replace the cells they address, so rows and columns edited by someone
/// else since the sheet was opened survive.
#[derive(Debug)]
pub struct JsonSheet {
    path: PathBuf,
    name: String,
    lock: Mutex<()>,
}

impl JsonSheet {
    async fn current(&self) -> Result<Grid> {
        let mut workbook = load(&self.path).await?;
        workbook
            .sheets
            .remove(&self.name)
            .ok_or_else(|| FormBatchError::SheetNotFound {
                name: self.name.clone(),
            })
    }
}

#[async_trait]
impl Sheet for JsonSheet {
    async fn headers(&self) -> Result<Vec<String>> {
        Ok(self.current().await?.headers())
    }

    async fn last_row(&self) -> Result<usize> {
        Ok(self.current().await?.last_row())
    }

    async fn read_column(
        &self,
        column: usize,
        start_row: usize,
        count: usize,
    ) -> Result<Vec<Cell>> {
        self.current().await?.read_column(column, start_row, count)
    }

    async fn write_column(
        &self,
        column: usize,
        start_row: usize,
        values: Vec<Cell>,
    ) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut workbook = load(&self.path).await?;
        let grid = workbook
            .sheets
            .get_mut(&self.name)
            .ok_or_else(|| FormBatchError::SheetNotFound {
                name: self.name.clone(),
            })?;
        grid.write_column(column, start_row, values)?;
        persist(&self.path, &workbook).await
    }

    async fn read_rows(&self) -> Result<Vec<Vec<Cell>>> {
        Ok(self.current().await?.data_rows())
    }
}
