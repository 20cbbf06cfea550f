//! Status overview.
//!
//! Prints the per-status histogram used by the dashboard's status cards,
//! for one batch or across all of them. A job whose QC status differs from
//! its data status is counted under both, so the buckets can sum to more
//! than the job total.

use anyhow::{bail, Result};
use std::collections::BTreeMap;

use batch_desk_core::models::KNOWN_STATUSES;

use crate::config::Config;
use crate::sqlite_store::open_store;

pub async fn run_stats(config: &Config, batch_id: Option<&str>) -> Result<()> {
    let store = open_store(config).await?;

    let (title, total) = match batch_id {
        Some(id) if !id.eq_ignore_ascii_case("all") => {
            let Some(batch) = store.get_batch(id).await? else {
                bail!("batch not found: {}", id);
            };
            (format!("{} ({})", batch.name, batch.id), batch.job_count)
        }
        _ => ("All batches".to_string(), store.get_all_jobs().await?.len()),
    };
    let counts = store.get_job_counts_by_status(batch_id).await?;

    println!("Job Status — {}", title);
    println!();
    for line in status_lines(&counts) {
        println!("  {}", line);
    }
    println!("  {}", "-".repeat(24));
    println!("  {:<14} {:>8}", "total jobs", total);
    Ok(())
}

/// Known statuses first (zero-filled), then any others present, sorted.
fn status_lines(counts: &BTreeMap<String, usize>) -> Vec<String> {
    let mut lines: Vec<String> = KNOWN_STATUSES
        .iter()
        .map(|s| format!("{:<14} {:>8}", s, counts.get(*s).copied().unwrap_or(0)))
        .collect();
    lines.extend(
        counts
            .iter()
            .filter(|(s, _)| !KNOWN_STATUSES.contains(&s.as_str()))
            .map(|(s, n)| format!("{:<14} {:>8}", s, n)),
    );
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_statuses_follow_known_ones() {
        let mut counts = BTreeMap::new();
        counts.insert("approved".to_string(), 2);
        counts.insert("on_hold".to_string(), 1);
        let lines = status_lines(&counts);
        assert_eq!(lines.len(), KNOWN_STATUSES.len() + 1);
        assert!(lines[0].starts_with("pending"));
        assert!(lines[0].ends_with(" 0"));
        assert!(lines.last().unwrap().starts_with("on_hold"));
    }
}
