//! Batch grid, job table and bulk assignment commands.

use anyhow::{bail, Result};

use batch_desk_core::models::{fields, Job};
use batch_desk_core::query::{paginate, JobQuery};
use batch_desk_core::store::today;

use crate::config::Config;
use crate::sqlite_store::open_store;

/// Columns shown by `bdesk jobs`, in order.
const JOB_COLUMNS: [&str; 5] = [
    fields::JOB_ID,
    fields::DATA_STATUS,
    fields::QC_STATUS,
    fields::ASSIGNED_TO,
    fields::ASSIGNED_DATE,
];

/// `bdesk batches`: one line per batch, seeds first.
pub async fn run_batches(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let batches = store.get_all_batches().await?;

    println!(
        "{:<12} {:<32} {:<6} {:>6}  {:<10}  {:<28} {}",
        "ID", "NAME", "TYPE", "JOBS", "UPLOADED", "BY", "STATUS"
    );
    println!("{}", "-".repeat(110));
    for b in &batches {
        println!(
            "{:<12} {:<32} {:<6} {:>6}  {:<10}  {:<28} {}",
            b.id,
            truncate(&b.name, 32),
            b.data_type,
            b.job_count,
            b.upload_date.format("%Y-%m-%d"),
            truncate(&b.uploaded_by, 28),
            b.status
        );
    }
    println!();
    println!("{} batch(es)", batches.len());
    Ok(())
}

/// `bdesk jobs <batch>`: filtered, paginated job table.
pub async fn run_jobs(config: &Config, batch_id: &str, query: &JobQuery, page: usize) -> Result<()> {
    let store = open_store(config).await?;
    let Some(batch) = store.get_batch(batch_id).await? else {
        bail!("batch not found: {}", batch_id);
    };

    let jobs = store.get_batch_jobs(&batch.id).await?;
    let filtered = query.apply(&jobs);
    let page = paginate(&filtered, page, config.listing.page_size);

    println!("{} ({}, {})", batch.name, batch.id, batch.data_type);
    println!();
    println!(
        "{:<16} {:<12} {:<10} {:<32} {}",
        "JOB", "STATUS", "QC", "ASSIGNED TO", "ASSIGNED"
    );
    println!("{}", "-".repeat(84));
    for job in &page.items {
        print_job_row(job);
    }

    println!();
    if page.total_items == 0 {
        println!("No jobs match.");
    } else {
        let first = (page.page - 1) * config.listing.page_size + 1;
        let last = first + page.items.len() - 1;
        println!(
            "Showing {} to {} of {} jobs (page {} of {})",
            first, last, page.total_items, page.page, page.total_pages
        );
    }
    Ok(())
}

/// `bdesk assign <batch> <job>... --to <email>`.
pub async fn run_assign(
    config: &Config,
    batch_id: &str,
    job_ids: &[String],
    assignee: &str,
    assigned_by: Option<&str>,
) -> Result<()> {
    if !assignee.contains('@') {
        bail!("assignee must be an email address: '{}'", assignee);
    }
    let store = open_store(config).await?;
    if store.get_batch(batch_id).await?.is_none() {
        bail!("batch not found: {}", batch_id);
    }

    let assigned_by = assigned_by.unwrap_or(&config.import.uploaded_by);
    let outcome = store
        .assign_jobs(batch_id, job_ids, assignee, assigned_by, today())
        .await?;

    println!(
        "Assigned {} of {} job(s) to {}.",
        outcome.updated.len(),
        job_ids.len(),
        assignee
    );
    if !outcome.missing.is_empty() {
        println!("Not found: {}", outcome.missing.join(", "));
    }
    if outcome.updated.is_empty() {
        bail!("no jobs were assigned");
    }
    Ok(())
}

fn print_job_row(job: &Job) {
    let cells: Vec<&str> = JOB_COLUMNS.iter().map(|c| job.field(c)).collect();
    println!(
        "{:<16} {:<12} {:<10} {:<32} {}",
        truncate(cells[0], 16),
        job.data_status(),
        or_dash(cells[2]),
        or_dash(&truncate(cells[3], 32)),
        or_dash(cells[4])
    );
}

fn or_dash(s: &str) -> String {
    if s.is_empty() {
        "-".to_string()
    } else {
        s.to_string()
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_values() {
        assert_eq!(truncate("batch-1", 12), "batch-1");
        assert_eq!(truncate("abcdefghij", 6), "abc...");
    }
}
