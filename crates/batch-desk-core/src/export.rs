//! CSV export of a batch's jobs.
//!
//! The header is `job_id` followed by every other column in the order it
//! first appears across the jobs. Cells a job lacks are left empty.

use anyhow::{Context, Result};
use indexmap::IndexSet;

use crate::models::{fields, Job};

/// Column order used when exporting `jobs`.
pub fn export_columns(jobs: &[Job]) -> Vec<String> {
    let mut columns: IndexSet<String> = IndexSet::new();
    columns.insert(fields::JOB_ID.to_string());
    for job in jobs {
        for key in job.fields.keys() {
            columns.insert(key.clone());
        }
    }
    columns.into_iter().collect()
}

/// Render jobs as CSV text (RFC 4180 quoting, `\n` line endings).
pub fn jobs_to_csv(jobs: &[Job]) -> Result<String> {
    let columns = export_columns(jobs);
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(&columns)?;
    for job in jobs {
        writer.write_record(columns.iter().map(|c| job.field(c)))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing CSV output: {}", e))?;
    String::from_utf8(bytes).context("CSV output was not UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataType;
    use crate::store::jobs_from_rows;
    use crate::table::parse_csv;

    #[test]
    fn header_is_union_in_first_seen_order() {
        let jobs = vec![
            Job::new("a").with("ref_id", "r1"),
            Job::new("b").with("note", "n").with("ref_id", "r2"),
        ];
        assert_eq!(export_columns(&jobs), vec!["job_id", "ref_id", "note"]);
        let text = jobs_to_csv(&jobs).unwrap();
        assert_eq!(text, "job_id,ref_id,note\na,r1,\nb,r2,n\n");
    }

    #[test]
    fn commas_are_quoted_and_reparse() {
        let jobs = vec![Job::new("a").with("client_file_name", "report, final.pdf")];
        let text = jobs_to_csv(&jobs).unwrap();
        assert!(text.contains("\"report, final.pdf\""));

        let table = parse_csv(&text).unwrap();
        let back = jobs_from_rows(&table.headers, &table.rows, DataType::Qced);
        assert_eq!(back, jobs);
    }

    #[test]
    fn empty_export_still_has_header() {
        assert_eq!(jobs_to_csv(&[]).unwrap(), "job_id\n");
    }
}
