//! In-memory sheets for tests and embedding.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Cell, Grid, Sheet, SheetProvider};
use crate::error::{FormBatchError, Result};

#[derive(Debug, Default)]
struct State {
    grid: Grid,
    column_writes: usize,
    fail_writes: bool,
}

/// A sheet held in memory. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemorySheet {
    state: Arc<Mutex<State>>,
}

impl MemorySheet {
    /// Creates a sheet from a header row and data rows.
    pub fn new(headers: &[&str], rows: Vec<Vec<Cell>>) -> Self {
        let mut all = Vec::with_capacity(rows.len() + 1);
        all.push(headers.iter().map(|h| Cell::text(*h)).collect());
        all.extend(rows);
        Self {
            state: Arc::new(Mutex::new(State {
                grid: Grid::new(all),
                ..State::default()
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Value of a single cell (1-based).
    pub fn cell(&self, row: usize, column: usize) -> Cell {
        self.state().grid.cell(row, column)
    }

    /// Number of `write_column` calls so far.
    pub fn column_writes(&self) -> usize {
        self.state().column_writes
    }

    /// Makes every subsequent write fail.
    pub fn fail_writes(&self) {
        self.state().fail_writes = true;
    }
}

#[async_trait]
impl Sheet for MemorySheet {
    async fn headers(&self) -> Result<Vec<String>> {
        Ok(self.state().grid.headers())
    }

    async fn last_row(&self) -> Result<usize> {
        Ok(self.state().grid.last_row())
    }

    async fn read_column(
        &self,
        column: usize,
        start_row: usize,
        count: usize,
    ) -> Result<Vec<Cell>> {
        self.state().grid.read_column(column, start_row, count)
    }

    async fn write_column(
        &self,
        column: usize,
        start_row: usize,
        values: Vec<Cell>,
    ) -> Result<()> {
        let mut state = self.state();
        if state.fail_writes {
            return Err(FormBatchError::sheet("injected write failure"));
        }
        state.column_writes += 1;
        state.grid.write_column(column, start_row, values)
    }

    async fn read_rows(&self) -> Result<Vec<Vec<Cell>>> {
        Ok(self.state().grid.data_rows())
    }
}

/// A workbook of named [`MemorySheet`]s.
///
/// The workbook identifier passed to `open_sheet` is ignored.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorkbook {
    sheets: HashMap<String, MemorySheet>,
    opens: Arc<Mutex<usize>>,
}

impl MemoryWorkbook {
    /// Creates an empty workbook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sheet under `name`.
    pub fn with_sheet(mut self, name: &str, sheet: MemorySheet) -> Self {
        self.sheets.insert(name.to_string(), sheet);
        self
    }

    /// Number of times a sheet was opened.
    pub fn opens(&self) -> usize {
        *self.opens.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SheetProvider for MemoryWorkbook {
    async fn open_sheet(&self, _sheet_id: &str, name: &str) -> Result<Box<dyn Sheet>> {
        *self.opens.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) += 1;
        self.sheets
            .get(name)
            .cloned()
            .map(|sheet| Box::new(sheet) as Box<dyn Sheet>)
            .ok_or_else(|| FormBatchError::SheetNotFound {
                name: name.to_string(),
            })
    }
}
