//! Batch storage.
//!
//! [`BatchStore`] keeps three JSON blobs in a pluggable [`BlobStore`]
//! backend:
//!
//! | Key | Contents |
//! |-----|----------|
//! | `batchJobs` | batch id → ordered job list |
//! | `batchMetadata` | batch id → [`BatchMetadata`] |
//! | `batchCount` | counter used to mint `Batch-<n>` ids |
//!
//! Every mutation is a read-modify-write of one whole blob, committed with
//! a versioned compare-and-swap. When another writer got there first the
//! edit is replayed against the fresh blob, so concurrent callers never
//! lose updates. After `max_attempts` conflicts the operation fails.
//!
//! Implementations of [`BlobStore`] must be `Send + Sync` to work with
//! async runtimes.

pub mod memory;
pub mod seed;

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use indexmap::{IndexMap, IndexSet};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::models::{
    batch_label, fields, normalize_batch_id, Batch, BatchMetadata, BatchStatus, DataType, Job,
    JobPatch, DEFAULT_STATUS,
};
use crate::validate::ValidationReport;

pub use memory::InMemoryBlobStore;

pub const JOBS_KEY: &str = "batchJobs";
pub const METADATA_KEY: &str = "batchMetadata";
pub const COUNTER_KEY: &str = "batchCount";

/// Conflicting writes tolerated before a mutation gives up.
pub const DEFAULT_MAX_ATTEMPTS: usize = 8;

/// Uploader recorded for batches whose metadata went missing.
const UNKNOWN_UPLOADER: &str = "user@company.com";

type JobMap = IndexMap<String, Vec<Job>>;
type MetadataMap = IndexMap<String, BatchMetadata>;

/// A stored blob together with its version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedBlob {
    pub version: u64,
    pub value: String,
}

/// Key-value persistence used by [`BatchStore`].
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`load`](BlobStore::load) | Read a blob and its version |
/// | [`compare_and_swap`](BlobStore::compare_and_swap) | Write iff the version is unchanged |
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read the blob stored under `key`, if any.
    async fn load(&self, key: &str) -> Result<Option<VersionedBlob>>;

    /// Replace the blob under `key` when its current version equals
    /// `expected` (`None` meaning "no blob yet").
    ///
    /// Returns the new version, or `None` when the version did not match
    /// and nothing was written.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<u64>,
        value: &str,
    ) -> Result<Option<u64>>;
}

/// What an edit closure decided to do with the blob it was handed.
enum Edit<R> {
    Commit(R),
    Discard(R),
}

/// Result of assigning several jobs of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentOutcome {
    pub updated: Vec<String>,
    pub missing: Vec<String>,
}

/// Parameters for committing a validated upload.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    /// Batch name; empty means "use the minted label".
    pub name: String,
    pub uploaded_by: String,
    pub checksum: Option<String>,
}

/// Batch and job storage over a [`BlobStore`].
pub struct BatchStore<B> {
    backend: B,
    max_attempts: usize,
}

impl<B: BlobStore> BatchStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mint a new batch id and persist its metadata.
    pub async fn create_batch(
        &self,
        name: &str,
        data_type: DataType,
        uploaded_by: &str,
    ) -> Result<Batch> {
        self.create_batch_with_checksum(name, data_type, uploaded_by, None)
            .await
    }

    async fn create_batch_with_checksum(
        &self,
        name: &str,
        data_type: DataType,
        uploaded_by: &str,
        checksum: Option<String>,
    ) -> Result<Batch> {
        let (_, jobs): (_, JobMap) = self.read(JOBS_KEY).await?;
        let (_, metadata): (_, MetadataMap) = self.read(METADATA_KEY).await?;
        let taken = |id: &str| seed::is_seed(id) || jobs.contains_key(id) || metadata.contains_key(id);

        let n = self
            .update(COUNTER_KEY, |count: &mut u64| {
                let mut next = *count + 1;
                while taken(&normalize_batch_id(&batch_label(next))) {
                    next += 1;
                }
                *count = next;
                Edit::Commit(next)
            })
            .await?;

        let label = batch_label(n);
        let id = normalize_batch_id(&label);
        let name = match name.trim() {
            "" => label,
            given => given.to_string(),
        };
        let meta = BatchMetadata {
            name,
            data_type,
            upload_date: today(),
            uploaded_by: uploaded_by.to_string(),
            status: BatchStatus::Completed,
            checksum,
        };

        self.update(METADATA_KEY, |all: &mut MetadataMap| {
            all.insert(id.clone(), meta.clone());
            Edit::Commit(())
        })
        .await?;

        info!(batch = %id, name = %meta.name, data_type = %data_type, "created batch");
        Ok(Batch::from_metadata(&id, &meta, 0))
    }

    /// Store one job per row under `batch_id`, replacing earlier contents.
    pub async fn import_jobs(
        &self,
        batch_id: &str,
        headers: &[String],
        rows: &[Vec<String>],
        data_type: DataType,
    ) -> Result<usize> {
        let id = normalize_batch_id(batch_id);
        let jobs = jobs_from_rows(headers, rows, data_type);
        let count = jobs.len();

        self.update(JOBS_KEY, |all: &mut JobMap| {
            all.insert(id.clone(), jobs.clone());
            Edit::Commit(())
        })
        .await?;

        info!(batch = %id, jobs = count, "imported jobs");
        Ok(count)
    }

    /// Create a batch for a validated upload and store its jobs.
    ///
    /// Refuses reports with validation errors. If the job write fails the
    /// batch is left behind with status `error`.
    pub async fn commit_import(
        &self,
        report: &ValidationReport,
        request: ImportRequest,
    ) -> Result<Batch> {
        if !report.is_valid() {
            bail!(
                "upload has {} validation error(s); nothing was imported",
                report.errors.len()
            );
        }

        let mut batch = self
            .create_batch_with_checksum(
                &request.name,
                report.data_type,
                &request.uploaded_by,
                request.checksum,
            )
            .await?;

        match self
            .import_jobs(
                &batch.id,
                &report.table.headers,
                &report.table.rows,
                report.data_type,
            )
            .await
        {
            Ok(count) => {
                batch.job_count = count;
                Ok(batch)
            }
            Err(e) => {
                warn!(batch = %batch.id, error = %e, "job import failed");
                if let Err(mark) = self.set_batch_status(&batch.id, BatchStatus::Error).await {
                    warn!(batch = %batch.id, error = %mark, "could not mark batch as failed");
                }
                Err(e).with_context(|| format!("importing jobs into {}", batch.id))
            }
        }
    }

    /// Change the status of a persisted batch. `false` if it has no metadata.
    pub async fn set_batch_status(&self, batch_id: &str, status: BatchStatus) -> Result<bool> {
        let id = normalize_batch_id(batch_id);
        self.update(METADATA_KEY, |all: &mut MetadataMap| match all.get_mut(&id) {
            Some(meta) => {
                meta.status = status;
                Edit::Commit(true)
            }
            None => Edit::Discard(false),
        })
        .await
    }

    /// Id of a persisted batch imported from content with this checksum.
    pub async fn find_by_checksum(&self, checksum: &str) -> Result<Option<String>> {
        let (_, metadata): (_, MetadataMap) = self.read(METADATA_KEY).await?;
        Ok(metadata
            .iter()
            .find(|(_, m)| m.checksum.as_deref() == Some(checksum))
            .map(|(id, _)| id.clone()))
    }

    /// Seed batches first, then every persisted batch in import order.
    pub async fn get_all_batches(&self) -> Result<Vec<Batch>> {
        let (_, jobs): (_, JobMap) = self.read(JOBS_KEY).await?;
        let (_, metadata): (_, MetadataMap) = self.read(METADATA_KEY).await?;

        let mut batches: Vec<Batch> = seed::seed_batches()
            .iter()
            .map(|(id, meta)| Batch::from_metadata(id, meta, jobs_for(&jobs, id).len()))
            .collect();

        // Metadata without jobs is a batch whose job write failed.
        let ids: IndexSet<&String> = metadata.keys().chain(jobs.keys()).collect();
        for id in ids {
            if seed::is_seed(id) {
                continue;
            }
            let meta = metadata
                .get(id)
                .cloned()
                .unwrap_or_else(|| fallback_metadata(id));
            let count = jobs.get(id).map_or(0, Vec::len);
            batches.push(Batch::from_metadata(id, &meta, count));
        }
        Ok(batches)
    }

    pub async fn get_batch(&self, batch_id: &str) -> Result<Option<Batch>> {
        let id = normalize_batch_id(batch_id);
        Ok(self
            .get_all_batches()
            .await?
            .into_iter()
            .find(|b| b.id == id))
    }

    /// Persisted jobs, else demonstration jobs for a seed id, else empty.
    pub async fn get_batch_jobs(&self, batch_id: &str) -> Result<Vec<Job>> {
        let (_, jobs): (_, JobMap) = self.read(JOBS_KEY).await?;
        Ok(jobs_for(&jobs, &normalize_batch_id(batch_id)))
    }

    /// Jobs of every listed batch, in listing order.
    pub async fn get_all_jobs(&self) -> Result<Vec<Job>> {
        let (_, jobs): (_, JobMap) = self.read(JOBS_KEY).await?;
        let mut ids: Vec<String> = seed::seed_batches()
            .iter()
            .map(|(id, _)| id.to_string())
            .collect();
        ids.extend(jobs.keys().filter(|id| !seed::is_seed(id)).cloned());
        Ok(ids.iter().flat_map(|id| jobs_for(&jobs, id)).collect())
    }

    /// Merge `patch` over one job. `false` when the batch or job is unknown.
    ///
    /// Demonstration jobs are written to the store on first edit.
    pub async fn update_batch_job(
        &self,
        batch_id: &str,
        job_id: &str,
        patch: &JobPatch,
    ) -> Result<bool> {
        let id = normalize_batch_id(batch_id);
        let job_id = job_id.trim();

        let updated = self
            .update(JOBS_KEY, |all: &mut JobMap| {
                if !all.contains_key(&id) {
                    match seed::seed_jobs(&id) {
                        Some(seeded) => {
                            all.insert(id.clone(), seeded);
                        }
                        None => return Edit::Discard(false),
                    }
                }
                let job = all
                    .get_mut(&id)
                    .and_then(|list| list.iter_mut().find(|j| j.job_id == job_id));
                match job {
                    Some(job) => {
                        job.apply(patch);
                        Edit::Commit(true)
                    }
                    None => Edit::Discard(false),
                }
            })
            .await?;

        if updated {
            debug!(batch = %id, job = job_id, "updated job");
        }
        Ok(updated)
    }

    /// Hand several jobs of one batch to `assignee`. Repeated ids count once.
    pub async fn assign_jobs(
        &self,
        batch_id: &str,
        job_ids: &[String],
        assignee: &str,
        assigned_by: &str,
        date: NaiveDate,
    ) -> Result<AssignmentOutcome> {
        let patch = JobPatch::assignment(assignee, assigned_by, date);
        let unique: IndexSet<&String> = job_ids.iter().collect();
        let mut outcome = AssignmentOutcome::default();
        for job_id in unique {
            if self.update_batch_job(batch_id, job_id, &patch).await? {
                outcome.updated.push(job_id.clone());
            } else {
                outcome.missing.push(job_id.clone());
            }
        }
        Ok(outcome)
    }

    /// Status histogram for one batch, or for every batch when `batch_id`
    /// is `None` or `"all"`. See [`count_by_status`].
    pub async fn get_job_counts_by_status(
        &self,
        batch_id: Option<&str>,
    ) -> Result<BTreeMap<String, usize>> {
        let jobs = match batch_id.map(normalize_batch_id) {
            Some(id) if id != "all" => self.get_batch_jobs(&id).await?,
            _ => self.get_all_jobs().await?,
        };
        Ok(count_by_status(&jobs))
    }

    async fn read<T>(&self, key: &str) -> Result<(Option<u64>, T)>
    where
        T: DeserializeOwned + Default,
    {
        match self.backend.load(key).await? {
            Some(blob) => {
                let value = serde_json::from_str(&blob.value)
                    .with_context(|| format!("Failed to decode '{}' blob", key))?;
                Ok((Some(blob.version), value))
            }
            None => Ok((None, T::default())),
        }
    }

    async fn update<T, R, F>(&self, key: &str, mut edit: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnMut(&mut T) -> Edit<R>,
    {
        for attempt in 1..=self.max_attempts {
            let (version, mut value) = self.read::<T>(key).await?;
            let result = match edit(&mut value) {
                Edit::Commit(r) => r,
                Edit::Discard(r) => return Ok(r),
            };
            let text = serde_json::to_string(&value)?;
            if self
                .backend
                .compare_and_swap(key, version, &text)
                .await?
                .is_some()
            {
                return Ok(result);
            }
            debug!(key, attempt, "blob changed concurrently; retrying");
        }
        bail!(
            "gave up writing '{}' after {} conflicting attempts",
            key,
            self.max_attempts
        )
    }
}

/// Build jobs by zipping headers to row cells.
///
/// Fresh jobs get every QC and assignment column the CSV lacks as an
/// empty value, so both data types share one job shape.
pub fn jobs_from_rows(headers: &[String], rows: &[Vec<String>], data_type: DataType) -> Vec<Job> {
    rows.iter()
        .map(|row| {
            let mut job = Job::new("");
            for (header, cell) in headers.iter().zip(row) {
                job.set(header, cell.as_str());
            }
            if data_type == DataType::Fresh {
                for key in fields::QC_FIELDS.iter().chain(&fields::ASSIGNMENT_FIELDS) {
                    job.ensure_field(key);
                }
            }
            job
        })
        .collect()
}

/// Count jobs per status.
///
/// Each job counts once under its `data_status` (empty → `pending`) and,
/// when its `qc_status` is set and not `pending`, once more under that
/// status. A completed-and-approved job therefore shows up in both
/// buckets.
pub fn count_by_status(jobs: &[Job]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for job in jobs {
        *counts.entry(job.data_status().to_string()).or_insert(0) += 1;
        if let Some(qc) = job.qc_status().filter(|s| *s != DEFAULT_STATUS) {
            *counts.entry(qc.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

fn jobs_for(jobs: &JobMap, id: &str) -> Vec<Job> {
    jobs.get(id)
        .cloned()
        .or_else(|| seed::seed_jobs(id))
        .unwrap_or_default()
}

fn fallback_metadata(id: &str) -> BatchMetadata {
    BatchMetadata {
        name: id.to_string(),
        data_type: DataType::Fresh,
        upload_date: today(),
        uploaded_by: UNKNOWN_UPLOADER.to_string(),
        status: BatchStatus::Completed,
        checksum: None,
    }
}

/// Local calendar date.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
