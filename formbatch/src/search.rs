//! Search over the tracking sheet for forms that can be recreated.
//!
//! Only rows with a real timestamp and a non-empty "Generated At" value are
//! returned. Filters combine with AND; an absent or blank filter matches
//! everything.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{FormBatchError, Result};
use crate::sheet::{Cell, SheetProvider, require_column};

/// Header of the submission timestamp column.
pub const TIMESTAMP_COLUMN: &str = "Timestamp";
/// Header of the first name column.
pub const FIRST_NAME_COLUMN: &str = "First Name";
/// Header of the last name column.
pub const LAST_NAME_COLUMN: &str = "Last Name";
/// Header of the column set when a document was generated for the row.
pub const GENERATED_AT_COLUMN: &str = "Generated At";

const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";
const OUTPUT_DATE_FORMAT: &str = "%-m/%-d/%Y";

/// Search filters. Dates use `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchQuery {
    /// Earliest submission day, inclusive.
    pub start: Option<String>,
    /// Latest submission day, inclusive.
    pub end: Option<String>,
    /// Substring of the first name, any case.
    pub first: Option<String>,
    /// Substring of the last name, any case.
    pub last: Option<String>,
    /// Exact form id.
    pub form_id: Option<String>,
}

/// A matching row, formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecreateRow {
    /// Submission day as `M/D/YYYY`.
    pub timestamp: String,
    /// "First Last", each capitalised.
    pub name: String,
    /// Generation day as `M/D/YYYY`, or the raw cell text.
    pub generated_at: String,
    /// Form id cell text.
    pub form_id: String,
}

/// A query with its bounds parsed and its text normalized.
#[derive(Debug)]
struct Filter {
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    first: String,
    last: String,
    form_id: String,
}

impl SearchQuery {
    fn compile(&self) -> Result<Filter> {
        let start = parse_day(self.start.as_deref(), "start")?
            .and_then(|day| day.and_hms_opt(0, 0, 0));
        let end = parse_day(self.end.as_deref(), "end")?
            .and_then(|day| day.and_hms_opt(23, 59, 59));

        Ok(Filter {
            start,
            end,
            first: normalized(self.first.as_deref()).to_lowercase(),
            last: normalized(self.last.as_deref()).to_lowercase(),
            form_id: normalized(self.form_id.as_deref()).to_string(),
        })
    }
}

fn normalized(value: Option<&str>) -> &str {
    value.map(str::trim).unwrap_or_default()
}

fn parse_day(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>> {
    let value = normalized(value);
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value, QUERY_DATE_FORMAT)
        .map(Some)
        .map_err(|_| {
            FormBatchError::invalid_query(format!("{field} date '{value}' is not YYYY-MM-DD"))
        })
}

/// Column positions (1-based) of the searched headers.
struct Columns {
    timestamp: usize,
    first_name: usize,
    last_name: usize,
    generated_at: usize,
    form_id: usize,
}

impl Columns {
    fn resolve(headers: &[String], form_id_column: &str) -> Result<Self> {
        Ok(Self {
            timestamp: require_column(headers, TIMESTAMP_COLUMN)?,
            first_name: require_column(headers, FIRST_NAME_COLUMN)?,
            last_name: require_column(headers, LAST_NAME_COLUMN)?,
            generated_at: require_column(headers, GENERATED_AT_COLUMN)?,
            form_id: require_column(headers, form_id_column)?,
        })
    }
}

fn cell(row: &[Cell], column: usize) -> &Cell {
    static EMPTY: Cell = Cell::Empty;
    row.get(column - 1).unwrap_or(&EMPTY)
}

/// Lowercases a name and upper-cases its first character.
fn capitalize(name: &str) -> String {
    let lower = name.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Filters data rows (header row excluded) against a query.
///
/// Results are ordered newest first; rows with equal timestamps keep sheet
/// order.
pub fn search_rows(
    headers: &[String],
    rows: &[Vec<Cell>],
    form_id_column: &str,
    query: &SearchQuery,
) -> Result<Vec<RecreateRow>> {
    let columns = Columns::resolve(headers, form_id_column)?;
    let filter = query.compile()?;

    let mut matches: Vec<(NaiveDateTime, RecreateRow)> = Vec::new();
    for row in rows {
        let Some(timestamp) = cell(row, columns.timestamp).as_date() else {
            continue;
        };
        if filter.start.is_some_and(|start| timestamp < start)
            || filter.end.is_some_and(|end| timestamp > end)
        {
            continue;
        }

        let first = cell(row, columns.first_name).to_text().to_lowercase();
        let last = cell(row, columns.last_name).to_text().to_lowercase();
        if !first.contains(&filter.first) || !last.contains(&filter.last) {
            continue;
        }

        let form_id = cell(row, columns.form_id).to_text();
        if !filter.form_id.is_empty() && form_id != filter.form_id {
            continue;
        }

        let generated_at = cell(row, columns.generated_at);
        if generated_at.is_empty() {
            continue;
        }
        let generated_at = match generated_at.as_date() {
            Some(date) => date.format(OUTPUT_DATE_FORMAT).to_string(),
            None => generated_at.to_text(),
        };

        let name = format!("{} {}", capitalize(&first), capitalize(&last))
            .trim()
            .to_string();

        matches.push((
            timestamp,
            RecreateRow {
                timestamp: timestamp.format(OUTPUT_DATE_FORMAT).to_string(),
                name,
                generated_at,
                form_id,
            },
        ));
    }

    matches.sort_by(|a, b| b.0.cmp(&a.0));
    Ok(matches.into_iter().map(|(_, row)| row).collect())
}

/// Opens the tracking sheet and searches it.
pub async fn search_forms(
    sheets: &dyn SheetProvider,
    config: &Config,
    query: &SearchQuery,
) -> Result<Vec<RecreateRow>> {
    let sheet = sheets.open_sheet(&config.sheet_id, &config.sheet_name).await?;
    let headers = sheet.headers().await?;
    let rows = sheet.read_rows().await?;

    let results = search_rows(&headers, &rows, &config.form_id_column, query)?;
    tracing::debug!(scanned = rows.len(), matched = results.len(), "searched sheet");
    Ok(results)
}
