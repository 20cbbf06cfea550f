//! CSV tokenizing.
//!
//! Splits raw upload text into a header row and data rows. Quoted fields
//! follow RFC 4180, so a quoted cell may hold commas, doubled quotes and
//! line breaks. Every cell is trimmed, and records whose cells are all empty
//! (blank or whitespace-only lines) are dropped.

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};

/// A parsed CSV: the header row plus the data rows, cells trimmed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Position of a column in the header row.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// 1-based line number of a data row as the user sees it (header = 1).
    pub fn row_number(index: usize) -> usize {
        index + 2
    }
}

/// Parse CSV text into a [`CsvTable`].
///
/// Rows may have a different arity from the header; that is reported by the
/// validator, not here.
pub fn parse_csv(text: &str) -> Result<CsvTable> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Malformed CSV near record {}", i + 1))?;
        let cells: Vec<String> = record.iter().map(|c| c.trim().to_string()).collect();
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        records.push(cells);
    }

    let mut records = records.into_iter();
    let headers = records.next().unwrap_or_default();
    Ok(CsvTable {
        headers,
        rows: records.collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_header_and_rows() {
        let t = parse_csv("job_id, ref_id\n j1 ,r1\nj2,r2\n").unwrap();
        assert_eq!(t.headers, vec!["job_id", "ref_id"]);
        assert_eq!(t.rows, vec![vec!["j1", "r1"], vec!["j2", "r2"]]);
    }

    #[test]
    fn blank_lines_are_discarded() {
        let t = parse_csv("\n\njob_id\n\n   \nj1\r\n\r\nj2\n").unwrap();
        assert_eq!(t.headers, vec!["job_id"]);
        assert_eq!(t.rows.len(), 2);
    }

    #[test]
    fn quoted_fields_keep_commas_and_quotes() {
        let t = parse_csv("job_id,note\nj1,\"a, b\"\nj2,\"say \"\"hi\"\"\"\n").unwrap();
        assert_eq!(t.rows[0][1], "a, b");
        assert_eq!(t.rows[1][1], "say \"hi\"");
    }

    #[test]
    fn ragged_rows_are_kept_as_is() {
        let t = parse_csv("a,b,c\n1,2\n1,2,3,4\n").unwrap();
        assert_eq!(t.rows[0].len(), 2);
        assert_eq!(t.rows[1].len(), 4);
    }

    #[test]
    fn empty_input_has_no_header() {
        let t = parse_csv("").unwrap();
        assert!(t.headers.is_empty());
        assert!(t.rows.is_empty());
    }

    #[test]
    fn bom_is_stripped() {
        let t = parse_csv("\u{feff}job_id\nj1\n").unwrap();
        assert_eq!(t.headers, vec!["job_id"]);
        assert_eq!(t.column("job_id"), Some(0));
    }

    #[test]
    fn row_numbers_count_the_header() {
        assert_eq!(CsvTable::row_number(0), 2);
        assert_eq!(CsvTable::row_number(4), 6);
    }
}
