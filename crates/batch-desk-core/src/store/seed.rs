//! Built-in demonstration batches.
//!
//! Two reserved ids, `batch-1` (qced) and `batch-2` (fresh), are always
//! listed and fall back to the jobs below until something is persisted
//! under their id.

use chrono::NaiveDate;

use crate::models::{fields, BatchMetadata, BatchStatus, DataType, Job};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

/// Seed batches in display order.
pub fn seed_batches() -> Vec<(&'static str, BatchMetadata)> {
    vec![
        (
            "batch-1",
            BatchMetadata {
                name: "Editor Performance Q1".to_string(),
                data_type: DataType::Qced,
                upload_date: date(2024, 1, 15),
                uploaded_by: "admin@company.com".to_string(),
                status: BatchStatus::Completed,
                checksum: None,
            },
        ),
        (
            "batch-2",
            BatchMetadata {
                name: "Attribute Errors Analysis".to_string(),
                data_type: DataType::Fresh,
                upload_date: date(2024, 1, 14),
                uploaded_by: "manager@company.com".to_string(),
                status: BatchStatus::Completed,
                checksum: None,
            },
        ),
    ]
}

pub fn is_seed(batch_id: &str) -> bool {
    seed_batches().iter().any(|(id, _)| *id == batch_id)
}

/// Demonstration jobs for a reserved batch id.
pub fn seed_jobs(batch_id: &str) -> Option<Vec<Job>> {
    match batch_id {
        "batch-1" => Some(vec![
            Job::new("job-001")
                .with("ref_id", "ref-001")
                .with("client_file_name", "document_001.pdf")
                .with("data_status", "completed")
                .with("making_date", "2024-01-10")
                .with("qc_name", "mayank.bisht@b2rtechnologies.com")
                .with("qc_date", "2024-01-12")
                .with("qc_status", "approved")
                .with("action", "approved")
                .with("assigned_to", "dimpal.arya@b2r.co.in")
                .with("assigned_date", "2024-01-10")
                .with("assigned_by", "admin@company.com"),
            Job::new("job-002")
                .with("ref_id", "ref-002")
                .with("client_file_name", "document_002.pdf")
                .with("data_status", "in_progress")
                .with("making_date", "2024-01-11")
                .with("qc_name", "pankaj.panwar@b2r.co.in")
                .with("qc_date", "")
                .with("qc_status", "pending")
                .with("action", "pending")
                .with("assigned_to", "harshita.arya@b2r.in")
                .with("assigned_date", "2024-01-11")
                .with("assigned_by", "admin@company.com"),
        ]),
        "batch-2" => Some(vec![
            unassigned_attribute_job("job-101", "attr-001", "attributes_001.json"),
            unassigned_attribute_job("job-102", "attr-002", "attributes_002.json"),
        ]),
        _ => None,
    }
}

fn unassigned_attribute_job(job_id: &str, ref_id: &str, file: &str) -> Job {
    let mut job = Job::new(job_id)
        .with("ref_id", ref_id)
        .with("client_file_name", file)
        .with("data_status", "pending");
    for key in fields::QC_FIELDS.iter().chain(&fields::ASSIGNMENT_FIELDS) {
        job.ensure_field(key);
    }
    job
}
