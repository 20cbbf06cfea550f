//! Core data models shared by the validator, the store and the interpreter.
//!
//! A [`Batch`] groups the [`Job`]s produced by one CSV upload. Jobs keep
//! their columns verbatim (in CSV order), so columns this crate does not
//! know about survive a round trip through the store.

use std::fmt;
use std::str::FromStr;

use anyhow::{bail, Result};
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Well-known job column names.
pub mod fields {
    pub const JOB_ID: &str = "job_id";
    pub const REF_ID: &str = "ref_id";
    pub const CLIENT_FILE_NAME: &str = "client_file_name";
    pub const CLIENT_FILE: &str = "client_file";
    pub const DATA_STATUS: &str = "data_status";
    pub const MAKING_DATE: &str = "making_date";
    pub const QC_NAME: &str = "qc_name";
    pub const QC_DATE: &str = "qc_date";
    pub const QC_STATUS: &str = "qc_status";
    pub const ACTION: &str = "action";
    pub const ASSIGNED_TO: &str = "assigned_to";
    pub const ASSIGNED_DATE: &str = "assigned_date";
    pub const ASSIGNED_BY: &str = "assigned_by";

    /// QC-history columns a fresh job is initialised with.
    pub const QC_FIELDS: [&str; 6] = [
        DATA_STATUS,
        MAKING_DATE,
        QC_NAME,
        QC_DATE,
        QC_STATUS,
        ACTION,
    ];

    pub const ASSIGNMENT_FIELDS: [&str; 3] = [ASSIGNED_TO, ASSIGNED_DATE, ASSIGNED_BY];
}

/// Status values the dashboard knows how to report on.
pub const KNOWN_STATUSES: [&str; 5] = ["pending", "in_progress", "completed", "approved", "rejected"];

/// Status used when a job has no `data_status`.
pub const DEFAULT_STATUS: &str = "pending";

/// Kind of data carried by an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// New annotation work without QC history.
    Fresh,
    /// Quality-controlled work with maker/QC names, dates and statuses.
    Qced,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Fresh => "fresh",
            DataType::Qced => "qced",
        }
    }

    /// Columns a CSV of this type must contain, in reporting order.
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            DataType::Fresh => &[fields::JOB_ID, fields::REF_ID, fields::CLIENT_FILE_NAME],
            DataType::Qced => &[
                fields::JOB_ID,
                fields::CLIENT_FILE,
                fields::DATA_STATUS,
                fields::MAKING_DATE,
                fields::QC_NAME,
                fields::QC_DATE,
                fields::QC_STATUS,
                fields::ACTION,
            ],
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fresh" => Ok(DataType::Fresh),
            "qced" | "qc'ed" | "qc" => Ok(DataType::Qced),
            other => bail!("Unknown data type: '{}'. Must be fresh or qced.", other),
        }
    }
}

/// Lifecycle state of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Processing,
    Completed,
    Error,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
            BatchStatus::Error => "error",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted per-batch metadata (everything but the jobs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub upload_date: NaiveDate,
    pub uploaded_by: String,
    pub status: BatchStatus,
    /// SHA-256 of the imported file text, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// A named group of jobs sharing one upload event and schema type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub upload_date: NaiveDate,
    pub uploaded_by: String,
    pub job_count: usize,
    pub status: BatchStatus,
}

impl Batch {
    pub fn from_metadata(id: &str, meta: &BatchMetadata, job_count: usize) -> Self {
        Self {
            id: id.to_string(),
            name: meta.name.clone(),
            data_type: meta.data_type,
            upload_date: meta.upload_date,
            uploaded_by: meta.uploaded_by.clone(),
            job_count,
            status: meta.status,
        }
    }
}

/// Normalise a user-supplied batch id to its stored key form.
pub fn normalize_batch_id(id: &str) -> String {
    id.trim().to_lowercase()
}

/// Display label for the `n`-th minted batch.
pub fn batch_label(n: u64) -> String {
    format!("Batch-{}", n)
}

/// One row of imported annotation/QC work, keyed by `job_id`.
///
/// Every other column lives in `fields`, in CSV column order. Serialises
/// flat: `{"job_id": "...", "ref_id": "...", ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    #[serde(flatten)]
    pub fields: IndexMap<String, String>,
}

impl Job {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            fields: IndexMap::new(),
        }
    }

    /// Builder-style field setter, mostly for seeds and tests.
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    /// Value of a column, `job_id` included. `None` when the column is absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        if key == fields::JOB_ID {
            return Some(&self.job_id);
        }
        self.fields.get(key).map(String::as_str)
    }

    /// Value of a column, empty when absent.
    pub fn field(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        if key == fields::JOB_ID {
            self.job_id = value.into();
        } else {
            self.fields.insert(key.to_string(), value.into());
        }
    }

    /// Fill `key` with an empty value unless the column already exists.
    pub fn ensure_field(&mut self, key: &str) {
        if key != fields::JOB_ID && !self.fields.contains_key(key) {
            self.fields.insert(key.to_string(), String::new());
        }
    }

    /// Merge a patch over this job; patch values win.
    pub fn apply(&mut self, patch: &JobPatch) {
        for (key, value) in &patch.fields {
            self.set(key, value.clone());
        }
    }

    /// `data_status`, defaulting to `pending` when empty or absent.
    pub fn data_status(&self) -> &str {
        match self.field(fields::DATA_STATUS) {
            "" => DEFAULT_STATUS,
            s => s,
        }
    }

    pub fn qc_status(&self) -> Option<&str> {
        match self.field(fields::QC_STATUS) {
            "" => None,
            s => Some(s),
        }
    }

    pub fn assigned_to(&self) -> Option<&str> {
        match self.field(fields::ASSIGNED_TO) {
            "" => None,
            s => Some(s),
        }
    }

    /// Iterate over all columns, `job_id` first.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &str)> {
        std::iter::once((fields::JOB_ID, self.job_id.as_str()))
            .chain(self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

/// A partial set of job fields to merge over an existing job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobPatch {
    pub fields: IndexMap<String, String>,
}

impl JobPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// The three audit fields written when a job is handed to someone.
    pub fn assignment(assignee: &str, assigned_by: &str, date: NaiveDate) -> Self {
        Self::new()
            .set(fields::ASSIGNED_TO, assignee)
            .set(fields::ASSIGNED_DATE, date.format("%Y-%m-%d").to_string())
            .set(fields::ASSIGNED_BY, assigned_by)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_serializes_flat() {
        let job = Job::new("job-1").with("ref_id", "r1").with("extra", "x");
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"job_id": "job-1", "ref_id": "r1", "extra": "x"})
        );
        let back: Job = serde_json::from_value(json).unwrap();
        assert_eq!(back, job);
    }

    #[test]
    fn empty_data_status_defaults_to_pending() {
        let job = Job::new("a").with("data_status", "");
        assert_eq!(job.data_status(), "pending");
        assert_eq!(job.qc_status(), None);
        assert_eq!(job.assigned_to(), None);
    }

    #[test]
    fn patch_overrides_existing_fields() {
        let mut job = Job::new("a").with("assigned_to", "old@x.com");
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        job.apply(&JobPatch::assignment("new@x.com", "admin", date));
        assert_eq!(job.field("assigned_to"), "new@x.com");
        assert_eq!(job.field("assigned_date"), "2024-03-01");
        assert_eq!(job.field("assigned_by"), "admin");
    }

    #[test]
    fn data_type_parses_aliases() {
        assert_eq!("QC'ed".parse::<DataType>().unwrap(), DataType::Qced);
        assert_eq!(" fresh ".parse::<DataType>().unwrap(), DataType::Fresh);
        assert!("raw".parse::<DataType>().is_err());
    }

    #[test]
    fn batch_metadata_uses_dashboard_keys() {
        let meta = BatchMetadata {
            name: "Q1".into(),
            data_type: DataType::Qced,
            upload_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            uploaded_by: "admin@company.com".into(),
            status: BatchStatus::Completed,
            checksum: None,
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["type"], "qced");
        assert_eq!(json["uploadDate"], "2024-01-15");
        assert_eq!(json["uploadedBy"], "admin@company.com");
        assert!(json.get("checksum").is_none());
    }
}
