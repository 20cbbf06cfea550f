//! # Batch Desk
//!
//! CSV import, validation and batch tracking for annotation/QC workflows.
//!
//! Batch Desk accepts job lists as CSV files, validates them against the
//! `fresh` or `qced` schema, stores them as batches, and lets operators
//! query, assign and export jobs from the command line or through a small
//! natural-language assistant.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌─────────────┐   ┌──────────┐
//! │ CSV file │──▶│ Validator  │──▶│ Batch Store │──▶│  SQLite  │
//! └──────────┘   └────────────┘   └──────┬──────┘   │  blobs   │
//!                                        │          └──────────┘
//!                      ┌─────────────────┤
//!                      ▼                 ▼
//!                 ┌──────────┐     ┌───────────┐
//!                 │   CLI    │     │ Assistant │
//!                 │ (bdesk)  │     │ ask/chat  │
//!                 └──────────┘     └───────────┘
//! ```
//!
//! Domain logic lives in `batch-desk-core`; this crate adds configuration,
//! the SQLite blob backend and the command implementations.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_store`] | SQLite blob backend |
//! | [`import`] | CSV upload, preview and commit |
//! | [`batches`] | Batch list, job table, bulk assign |
//! | [`stats`] | Status overview |
//! | [`export`] | CSV export |
//! | [`assistant`] | Natural-language commands |
//! | [`progress`] | Progress output on stderr |
//! | [`logging`] | Tracing subscriber setup |

pub mod assistant;
pub mod batches;
pub mod config;
pub mod db;
pub mod export;
pub mod import;
pub mod logging;
pub mod migrate;
pub mod progress;
pub mod sqlite_store;
pub mod stats;
