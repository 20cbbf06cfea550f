//! Upload validation.
//!
//! Checks a parsed CSV against the schema of the selected [`DataType`] and
//! for data integrity. All checks run; errors are accumulated so the user
//! sees every problem in one pass. Validation never touches the store.
//!
//! | Check | Error kind |
//! |-------|------------|
//! | Required columns present | `missing_columns` (one error naming all) |
//! | Unique header names | `schema_mismatch` |
//! | Row arity equals header arity | `schema_mismatch` (one error, all rows) |
//! | Non-empty `job_id` per row | `schema_mismatch` (one error, all rows) |
//! | Unique `job_id` values | `duplicate_ids` (distinct ids) |
//! | Parsable `making_date` / `qc_date` (qced only) | `invalid_dates` (one per cell) |

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::{fields, DataType};
use crate::table::{parse_csv, CsvTable};

/// Number of data rows shown in an upload preview.
pub const PREVIEW_ROWS: usize = 5;

/// Date columns checked for qced uploads.
const DATE_COLUMNS: [&str; 2] = [fields::MAKING_DATE, fields::QC_DATE];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    MissingColumns,
    DuplicateIds,
    InvalidDates,
    SchemaMismatch,
}

impl ValidationErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationErrorKind::MissingColumns => "missing_columns",
            ValidationErrorKind::DuplicateIds => "duplicate_ids",
            ValidationErrorKind::InvalidDates => "invalid_dates",
            ValidationErrorKind::SchemaMismatch => "schema_mismatch",
        }
    }
}

/// One problem found in an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    #[serde(rename = "type")]
    pub kind: ValidationErrorKind,
    pub message: String,
    /// Offending 1-based row numbers (header = row 1), when applicable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<usize>,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: String) -> Self {
        Self {
            kind,
            message,
            rows: Vec::new(),
        }
    }

    fn with_rows(mut self, rows: Vec<usize>) -> Self {
        self.rows = rows;
        self
    }
}

/// Outcome of validating one upload.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub data_type: DataType,
    pub table: CsvTable,
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    /// An upload may be committed only when no error was found.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Header row followed by the first [`PREVIEW_ROWS`] data rows.
    pub fn preview(&self) -> Vec<Vec<String>> {
        let mut out = Vec::with_capacity(PREVIEW_ROWS + 1);
        out.push(self.table.headers.clone());
        out.extend(self.table.rows.iter().take(PREVIEW_ROWS).cloned());
        out
    }

    pub fn row_count(&self) -> usize {
        self.table.rows.len()
    }

    pub fn errors_of(&self, kind: ValidationErrorKind) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(move |e| e.kind == kind)
    }
}

/// Parse and validate raw CSV text for the given data type.
pub fn validate_csv(text: &str, data_type: DataType) -> ValidationReport {
    match parse_csv(text) {
        Ok(table) => validate_table(table, data_type),
        Err(e) => ValidationReport {
            data_type,
            table: CsvTable::default(),
            errors: vec![ValidationError::new(
                ValidationErrorKind::SchemaMismatch,
                format!("Could not read CSV: {:#}", e),
            )],
        },
    }
}

/// Validate an already-parsed table.
pub fn validate_table(table: CsvTable, data_type: DataType) -> ValidationReport {
    let mut errors = Vec::new();

    errors.extend(check_required_columns(&table, data_type));
    errors.extend(check_header_names(&table));
    errors.extend(check_row_arity(&table));
    errors.extend(check_missing_job_ids(&table));
    errors.extend(check_duplicate_ids(&table));
    if data_type == DataType::Qced {
        errors.extend(check_dates(&table));
    }

    ValidationReport {
        data_type,
        table,
        errors,
    }
}

fn check_required_columns(table: &CsvTable, data_type: DataType) -> Option<ValidationError> {
    let missing: Vec<&str> = data_type
        .required_columns()
        .iter()
        .copied()
        .filter(|col| table.column(col).is_none())
        .collect();
    if missing.is_empty() {
        return None;
    }
    Some(ValidationError::new(
        ValidationErrorKind::MissingColumns,
        format!("Missing required columns: {}", missing.join(", ")),
    ))
}

fn check_header_names(table: &CsvTable) -> Option<ValidationError> {
    let mut seen = HashSet::new();
    let mut repeated: Vec<&str> = Vec::new();
    for h in &table.headers {
        if !seen.insert(h.as_str()) && !repeated.contains(&h.as_str()) {
            repeated.push(h);
        }
    }
    if repeated.is_empty() {
        return None;
    }
    Some(ValidationError::new(
        ValidationErrorKind::SchemaMismatch,
        format!("Duplicate column names in header: {}", repeated.join(", ")),
    ))
}

fn check_row_arity(table: &CsvTable) -> Option<ValidationError> {
    let width = table.headers.len();
    let rows: Vec<usize> = table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row.len() != width)
        .map(|(i, _)| CsvTable::row_number(i))
        .collect();
    if rows.is_empty() {
        return None;
    }
    Some(
        ValidationError::new(
            ValidationErrorKind::SchemaMismatch,
            format!(
                "Rows with a column count different from the header ({} columns): {}",
                width,
                join_numbers(&rows)
            ),
        )
        .with_rows(rows),
    )
}

fn check_missing_job_ids(table: &CsvTable) -> Option<ValidationError> {
    let col = table.column(fields::JOB_ID)?;
    let rows: Vec<usize> = table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row.get(col).map_or(true, |v| v.is_empty()))
        .map(|(i, _)| CsvTable::row_number(i))
        .collect();
    if rows.is_empty() {
        return None;
    }
    Some(
        ValidationError::new(
            ValidationErrorKind::SchemaMismatch,
            format!("Rows without a job_id: {}", join_numbers(&rows)),
        )
        .with_rows(rows),
    )
}

fn check_duplicate_ids(table: &CsvTable) -> Option<ValidationError> {
    let col = table.column(fields::JOB_ID)?;

    let mut rows_by_id: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut duplicated: Vec<&str> = Vec::new();
    for (i, row) in table.rows.iter().enumerate() {
        let Some(id) = row.get(col).map(String::as_str).filter(|v| !v.is_empty()) else {
            continue;
        };
        let rows = rows_by_id.entry(id).or_default();
        rows.push(CsvTable::row_number(i));
        if rows.len() == 2 {
            duplicated.push(id);
        }
    }
    if duplicated.is_empty() {
        return None;
    }

    let mut rows: Vec<usize> = duplicated
        .iter()
        .flat_map(|id| rows_by_id[id].iter().copied())
        .collect();
    rows.sort_unstable();
    Some(
        ValidationError::new(
            ValidationErrorKind::DuplicateIds,
            format!("Duplicate job_ids found: {}", duplicated.join(", ")),
        )
        .with_rows(rows),
    )
}

fn check_dates(table: &CsvTable) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for name in DATE_COLUMNS {
        let Some(col) = table.column(name) else {
            continue;
        };
        for (i, row) in table.rows.iter().enumerate() {
            let value = row.get(col).map(String::as_str).unwrap_or("");
            if value.is_empty() || parse_calendar_date(value).is_some() {
                continue;
            }
            let row_no = CsvTable::row_number(i);
            errors.push(
                ValidationError::new(
                    ValidationErrorKind::InvalidDates,
                    format!("Invalid date format in {} at row {}: {}", name, row_no, value),
                )
                .with_rows(vec![row_no]),
            );
        }
    }
    errors
}

// Numeric fields parse with or without zero padding.
const DATE_FORMATS: [&str; 9] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parse a cell as a calendar date, accepting the shapes exported by the
/// usual spreadsheet tools.
pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(value, fmt) {
            return Some(d);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt.date());
        }
    }
    None
}

fn join_numbers(rows: &[usize]) -> String {
    rows.iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
