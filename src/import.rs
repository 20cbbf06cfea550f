//! CSV upload: file checks, validation preview and commit.
//!
//! Replaces the dashboard's import modal. `bdesk validate` stops after the
//! preview; `bdesk import` additionally creates a batch and stores its jobs.
//! Only `*.csv` files up to `import.max_file_bytes` are accepted.

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::warn;

use batch_desk_core::models::{Batch, DataType};
use batch_desk_core::store::{BatchStore, BlobStore, ImportRequest};
use batch_desk_core::validate::{validate_csv, ValidationReport, PREVIEW_ROWS};

use crate::config::Config;
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::sqlite_store::open_store;

/// Widest cell shown in the preview table.
const PREVIEW_CELL_WIDTH: usize = 24;

/// A CSV file read from disk and accepted by the size/extension gate.
#[derive(Debug, Clone)]
pub struct Upload {
    pub path: PathBuf,
    pub text: String,
    /// Hex SHA-256 of the file text.
    pub checksum: String,
}

/// Result of committing an upload.
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub batch: Batch,
    /// Earlier batch imported from identical content, if any.
    pub duplicate_of: Option<String>,
}

/// Options for `bdesk import`.
#[derive(Debug, Clone)]
pub struct ImportArgs {
    pub file: PathBuf,
    pub data_type: DataType,
    pub name: Option<String>,
    pub uploaded_by: Option<String>,
    pub dry_run: bool,
}

pub fn read_upload(path: &Path, max_bytes: u64) -> Result<Upload> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if !is_csv {
        bail!("Only .csv files can be imported: {}", path.display());
    }

    let size = std::fs::metadata(path)
        .with_context(|| format!("Failed to read {}", path.display()))?
        .len();
    if size > max_bytes {
        bail!(
            "{} is {} bytes; the import limit is {} bytes (import.max_file_bytes)",
            path.display(),
            size,
            max_bytes
        );
    }

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    Ok(Upload {
        path: path.to_path_buf(),
        checksum: checksum(&text),
        text,
    })
}

pub fn checksum(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Commit a validated upload as a new batch.
pub async fn import_upload<B: BlobStore>(
    store: &BatchStore<B>,
    upload: &Upload,
    report: &ValidationReport,
    name: &str,
    uploaded_by: &str,
) -> Result<ImportOutcome> {
    let duplicate_of = store.find_by_checksum(&upload.checksum).await?;
    if let Some(existing) = &duplicate_of {
        warn!(
            file = %upload.path.display(),
            batch = %existing,
            "identical content was already imported"
        );
    }

    let batch = store
        .commit_import(
            report,
            ImportRequest {
                name: name.to_string(),
                uploaded_by: uploaded_by.to_string(),
                checksum: Some(upload.checksum.clone()),
            },
        )
        .await?;

    Ok(ImportOutcome {
        batch,
        duplicate_of,
    })
}

/// `bdesk validate`: print the preview and every error. Fails when invalid.
pub fn run_validate(config: &Config, file: &Path, data_type: DataType) -> Result<()> {
    let upload = read_upload(file, config.import.max_file_bytes)?;
    let report = validate_csv(&upload.text, data_type);
    print_report(&upload, &report);

    if !report.is_valid() {
        bail!("validation failed with {} error(s)", report.errors.len());
    }
    Ok(())
}

/// `bdesk import`: validate, then create a batch holding the jobs.
pub async fn run_import(
    config: &Config,
    args: ImportArgs,
    progress: &dyn ProgressReporter,
) -> Result<()> {
    let file = args.file.display().to_string();
    progress.report(ProgressEvent::Validating { file: file.clone() });
    let upload = read_upload(&args.file, config.import.max_file_bytes)?;
    let report = validate_csv(&upload.text, args.data_type);
    print_report(&upload, &report);

    if !report.is_valid() {
        bail!(
            "validation failed with {} error(s); nothing was imported",
            report.errors.len()
        );
    }

    if args.dry_run {
        println!();
        println!(
            "Dry run: would import {} jobs as a new {} batch.",
            report.row_count(),
            report.data_type
        );
        return Ok(());
    }

    let store = open_store(config).await?;
    let uploaded_by = args
        .uploaded_by
        .unwrap_or_else(|| config.import.uploaded_by.clone());

    progress.report(ProgressEvent::Importing {
        file,
        rows: report.row_count() as u64,
    });
    let outcome = import_upload(
        &store,
        &upload,
        &report,
        args.name.as_deref().unwrap_or(""),
        &uploaded_by,
    )
    .await?;

    println!();
    if let Some(existing) = &outcome.duplicate_of {
        println!("Note: identical content was already imported as {}.", existing);
    }
    println!(
        "Imported {} jobs into {} ({}).",
        outcome.batch.job_count, outcome.batch.id, outcome.batch.name
    );
    Ok(())
}

fn print_report(upload: &Upload, report: &ValidationReport) {
    println!("File:  {}", upload.path.display());
    println!("Type:  {}", report.data_type);
    println!("Rows:  {}", report.row_count());

    if !report.table.headers.is_empty() {
        println!();
        println!("Preview (first {} rows):", PREVIEW_ROWS);
        for row in report.preview() {
            let cells: Vec<String> = row.iter().map(|c| clip(c)).collect();
            println!("  {}", cells.join(" | "));
        }
    }

    println!();
    if report.is_valid() {
        println!("Validation: OK");
        return;
    }
    println!("Validation failed: {} error(s)", report.errors.len());
    for err in &report.errors {
        if err.rows.is_empty() {
            println!("  [{}] {}", err.kind.as_str(), err.message);
        } else {
            let rows: Vec<String> = err.rows.iter().map(|r| r.to_string()).collect();
            println!(
                "  [{}] {} (rows {})",
                err.kind.as_str(),
                err.message,
                rows.join(", ")
            );
        }
    }
}

fn clip(cell: &str) -> String {
    if cell.chars().count() <= PREVIEW_CELL_WIDTH {
        return cell.to_string();
    }
    let kept: String = cell.chars().take(PREVIEW_CELL_WIDTH - 1).collect();
    format!("{}…", kept)
}
