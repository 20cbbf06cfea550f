//! Export a batch's jobs as CSV.
//!
//! The output re-imports cleanly: `job_id` first, then every other column
//! in first-seen order, quoted where needed.

use anyhow::{bail, Context, Result};
use std::path::Path;

use batch_desk_core::export::jobs_to_csv;

use crate::config::Config;
use crate::sqlite_store::open_store;

/// Export one batch.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout for piping.
pub async fn run_export(config: &Config, batch_id: &str, output: Option<&Path>) -> Result<()> {
    let store = open_store(config).await?;
    let Some(batch) = store.get_batch(batch_id).await? else {
        bail!("batch not found: {}", batch_id);
    };

    let jobs = store.get_batch_jobs(&batch.id).await?;
    let csv = jobs_to_csv(&jobs)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(path, &csv)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "Exported {} jobs from {} to {}",
                jobs.len(),
                batch.id,
                path.display()
            );
        }
        None => {
            print!("{}", csv);
        }
    }

    Ok(())
}
