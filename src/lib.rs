//! # snapfill
//!
//! Batch screenshot worker: it drains a catalog of pending captures, renders
//! each target address in headless Chromium, uploads the JPEG to an
//! S3-compatible bucket, and reports the outcome back to the catalog.
//!
//! ## Design Philosophy
//!
//! snapfill is designed to be:
//! - **Batch-oriented** - One run processes the backlog, then exits
//! - **Failure-isolated** - A bad item is reported and skipped, never fatal
//! - **Single-engine** - One browser instance serves every capture in a run
//! - **Library-first** - The binaries are thin wrappers over [`Orchestrator`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use snapfill::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env();
//!     let mut orchestrator = Orchestrator::from_config(&config)?;
//!
//!     let summary = orchestrator.run().await?;
//!     println!("{} succeeded, {} failed", summary.succeeded, summary.failed);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Screenshot capture and rendering-engine lifecycle
pub mod capture;
/// Catalog API client
pub mod catalog;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// The run loop
pub mod orchestrator;
/// Artifact storage
pub mod storage;

// Re-export commonly used types
pub use capture::{
    CaptureService, ChromiumLauncher, EngineHandle, EngineLauncher, EngineSession, EngineState,
};
pub use catalog::{CatalogClient, PendingBatch, ReportPayload, WorkItem};
pub use config::{CaptureConfig, CatalogConfig, Config, StorageConfig};
pub use error::{CaptureError, CatalogError, Error, Result, StorageError};
pub use orchestrator::{MAX_DRAIN_BATCHES, Orchestrator, RunMode, RunState, RunSummary};
pub use storage::StorageSink;
