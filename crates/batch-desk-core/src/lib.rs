//! # Batch Desk Core
//!
//! Shared, runtime-free logic for Batch Desk: the job/batch data model,
//! CSV tokenizing and validation, the batch store over a pluggable blob
//! backend, job filtering, CSV export and the command interpreter.
//!
//! This crate contains no tokio, sqlx or filesystem I/O. Persistent
//! backends live in the `batch-desk` crate.

pub mod command;
pub mod export;
pub mod interpreter;
pub mod models;
pub mod query;
pub mod store;
pub mod table;
pub mod validate;
