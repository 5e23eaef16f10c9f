//! Spreadsheet adapter.
//!
//! The tracking sheet is addressed the way spreadsheet services address it:
//! row 1 holds the headers, data starts at row 2, and both rows and columns
//! are 1-based. Columns are always located by header name through
//! [`column_index`], never by a fixed position.

pub mod json;
pub mod memory;

pub use json::JsonWorkbook;
pub use memory::{MemorySheet, MemoryWorkbook};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{FormBatchError, Result};

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    /// A date-time in sheet-local time.
    Date {
        /// The stored value.
        date: NaiveDateTime,
    },
    /// A boolean.
    Bool(bool),
    /// A number.
    Number(f64),
    /// Free text.
    Text(String),
    /// No value.
    #[default]
    Empty,
}

impl Cell {
    /// Creates a text cell.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Creates a date cell.
    pub fn date(date: NaiveDateTime) -> Self {
        Self::Date { date }
    }

    /// Whether the cell holds nothing (blank text counts as nothing).
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    /// The cell rendered as text.
    pub fn to_text(&self) -> String {
        match self {
            Self::Date { date } => date.format("%Y-%m-%d %H:%M:%S").to_string(),
            Self::Bool(value) => value.to_string(),
            Self::Number(value) => value.to_string(),
            Self::Text(text) => text.clone(),
            Self::Empty => String::new(),
        }
    }

    /// The date-time value, if this is a date cell.
    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Date { date } => Some(*date),
            _ => None,
        }
    }
}

/// A named sheet inside a workbook.
#[async_trait]
pub trait Sheet: Send + Sync {
    /// Header row values, in column order.
    async fn headers(&self) -> Result<Vec<String>>;

    /// Index of the last row holding data (1 when only headers exist).
    async fn last_row(&self) -> Result<usize>;

    /// Reads `count` cells of a column starting at `start_row`.
    ///
    /// Cells past the end of the data read as [`Cell::Empty`].
    async fn read_column(&self, column: usize, start_row: usize, count: usize)
    -> Result<Vec<Cell>>;

    /// Writes consecutive cells of a column starting at `start_row` in one
    /// operation.
    async fn write_column(&self, column: usize, start_row: usize, values: Vec<Cell>)
    -> Result<()>;

    /// Every data row below the header row.
    async fn read_rows(&self) -> Result<Vec<Vec<Cell>>>;
}

/// Opens sheets by workbook identifier and sheet name.
#[async_trait]
pub trait SheetProvider: Send + Sync {
    /// Opens the named sheet of a workbook.
    ///
    /// Returns `FormBatchError::SheetNotFound` if the workbook has no sheet
    /// with that name.
    async fn open_sheet(&self, sheet_id: &str, name: &str) -> Result<Box<dyn Sheet>>;
}

/// 1-based index of the column whose trimmed header equals `name`.
pub fn column_index(headers: &[String], name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.trim() == name)
        .map(|index| index + 1)
}

/// Like [`column_index`], failing with `MissingColumn`.
pub fn require_column(headers: &[String], name: &str) -> Result<usize> {
    column_index(headers, name).ok_or_else(|| FormBatchError::missing_column(name))
}

/// Row-major cell storage shared by the bundled sheet implementations.
///
/// `rows[0]` is the header row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct Grid {
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub(crate) fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub(crate) fn headers(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|row| row.iter().map(Cell::to_text).collect())
            .unwrap_or_default()
    }

    pub(crate) fn last_row(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn read_column(
        &self,
        column: usize,
        start_row: usize,
        count: usize,
    ) -> Result<Vec<Cell>> {
        check_position(column, start_row)?;
        Ok((start_row..start_row + count)
            .map(|row| {
                self.rows
                    .get(row - 1)
                    .and_then(|cells| cells.get(column - 1))
                    .cloned()
                    .unwrap_or_default()
            })
            .collect())
    }

    pub(crate) fn write_column(
        &mut self,
        column: usize,
        start_row: usize,
        values: Vec<Cell>,
    ) -> Result<()> {
        check_position(column, start_row)?;
        for (offset, value) in values.into_iter().enumerate() {
            let row_index = start_row - 1 + offset;
            if self.rows.len() <= row_index {
                self.rows.resize_with(row_index + 1, Vec::new);
            }
            let row = &mut self.rows[row_index];
            if row.len() < column {
                row.resize_with(column, Cell::default);
            }
            row[column - 1] = value;
        }
        Ok(())
    }

    pub(crate) fn data_rows(&self) -> Vec<Vec<Cell>> {
        self.rows.iter().skip(1).cloned().collect()
    }

    pub(crate) fn cell(&self, row: usize, column: usize) -> Cell {
        self.rows
            .get(row.wrapping_sub(1))
            .and_then(|cells| cells.get(column.wrapping_sub(1)))
            .cloned()
            .unwrap_or_default()
    }
}

fn check_position(column: usize, row: usize) -> Result<()> {
    if column == 0 || row == 0 {
        return Err(FormBatchError::sheet(format!(
            "rows and columns are 1-based (row {row}, column {column})"
        )));
    }
    Ok(())
}
