//! Integration tests for the SQLite blob backend.
//!
//! Drives [`BatchStore`] over [`SqliteBlobStore`] against a temporary
//! database file to verify persistence, compare-and-swap semantics and
//! behaviour under concurrent writers.

use std::path::PathBuf;

use batch_desk::config::{Config, DbConfig};
use batch_desk::sqlite_store::{open_store, SqliteBlobStore};
use batch_desk_core::models::{DataType, JobPatch};
use batch_desk_core::store::{BatchStore, BlobStore, ImportRequest, JOBS_KEY};
use batch_desk_core::validate::validate_csv;
use tempfile::TempDir;

fn config_in(tmp: &TempDir) -> Config {
    Config {
        db: DbConfig {
            path: PathBuf::from(tmp.path()).join("data").join("bdesk.sqlite"),
        },
        ..Config::minimal()
    }
}

async fn open(tmp: &TempDir) -> BatchStore<SqliteBlobStore> {
    open_store(&config_in(tmp)).await.unwrap()
}

#[tokio::test]
async fn cas_only_succeeds_on_matching_version() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp).await;
    let backend = store.backend();

    assert!(backend.load("k").await.unwrap().is_none());
    assert_eq!(backend.compare_and_swap("k", None, "a").await.unwrap(), Some(1));
    assert_eq!(backend.compare_and_swap("k", None, "x").await.unwrap(), None);
    assert_eq!(backend.compare_and_swap("k", Some(7), "x").await.unwrap(), None);
    assert_eq!(backend.compare_and_swap("k", Some(1), "b").await.unwrap(), Some(2));

    let blob = backend.load("k").await.unwrap().unwrap();
    assert_eq!(blob.version, 2);
    assert_eq!(blob.value, "b");
}

#[tokio::test]
async fn imported_batches_survive_reopen() {
    let tmp = TempDir::new().unwrap();
    let report = validate_csv(
        "job_id,ref_id,client_file_name,extra\nj1,r1,a.pdf,x\nj2,r2,b.pdf,y\n",
        DataType::Fresh,
    );

    let id = {
        let store = open(&tmp).await;
        let batch = store
            .commit_import(
                &report,
                ImportRequest {
                    name: "Week 3".into(),
                    uploaded_by: "lead@x.com".into(),
                    checksum: Some("sum".into()),
                },
            )
            .await
            .unwrap();
        batch.id
    };

    let store = open(&tmp).await;
    let batch = store.get_batch(&id).await.unwrap().unwrap();
    assert_eq!(batch.name, "Week 3");
    assert_eq!(batch.job_count, 2);
    assert_eq!(store.find_by_checksum("sum").await.unwrap(), Some(id.clone()));

    let jobs = store.get_batch_jobs(&id).await.unwrap();
    assert_eq!(jobs[1].field("extra"), "y");
    assert_eq!(jobs[1].field("qc_status"), "");
}

#[tokio::test]
async fn seed_edits_are_persisted() {
    let tmp = TempDir::new().unwrap();
    let store = open(&tmp).await;
    assert!(store.backend().load(JOBS_KEY).await.unwrap().is_none());

    let patch = JobPatch::new().set("assigned_to", "x@y.com");
    assert!(store.update_batch_job("batch-1", "job-001", &patch).await.unwrap());
    assert!(store.backend().load(JOBS_KEY).await.unwrap().is_some());

    let reopened = open(&tmp).await;
    let jobs = reopened.get_batch_jobs("batch-1").await.unwrap();
    assert_eq!(jobs[0].field("assigned_to"), "x@y.com");
    assert_eq!(jobs.len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_stores_do_not_lose_updates() {
    let tmp = TempDir::new().unwrap();
    let cfg = config_in(&tmp);

    let seed = open_store(&cfg).await.unwrap();
    let headers = vec!["job_id".to_string()];
    let rows: Vec<Vec<String>> = (0..8).map(|i| vec![format!("j{}", i)]).collect();
    seed.import_jobs("batch-9", &headers, &rows, DataType::Qced)
        .await
        .unwrap();

    // Separate pools stand in for separate processes.
    let mut handles = Vec::new();
    for i in 0..8 {
        let store = open_store(&cfg).await.unwrap().with_max_attempts(64);
        handles.push(tokio::spawn(async move {
            let patch = JobPatch::new().set("assigned_to", format!("u{}@x.com", i));
            store
                .update_batch_job("batch-9", &format!("j{}", i), &patch)
                .await
        }));
    }
    for h in handles {
        assert!(h.await.unwrap().unwrap());
    }

    let jobs = seed.get_batch_jobs("batch-9").await.unwrap();
    for (i, job) in jobs.iter().enumerate() {
        assert_eq!(job.field("assigned_to"), format!("u{}@x.com", i));
    }
}
