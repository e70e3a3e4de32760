//! The run loop: discover pending items, process each one, report outcomes.
//!
//! One [`Orchestrator`] owns one run from configuration validation to the
//! final summary. It decides between targeted and drain mode, fetches batches,
//! drives the per-item capture→store→report pipeline strictly in order, and
//! releases the rendering engine on every exit path, including fatal ones.
//!
//! Failure isolation is the core rule here: an item's capture, upload, or
//! report failure is recorded against that item and the loop moves on. Only
//! configuration problems and catalog listing failures end the run.

use std::fmt;

use chrono::Utc;

use crate::capture::{CaptureService, ChromiumLauncher};
use crate::catalog::{CatalogClient, PendingBatch, ReportPayload, WorkItem};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::StorageSink;


/// Upper bound on batches fetched in drain mode.
///
/// A backlog that never empties (or a catalog that keeps returning the same
/// items) must not pin the worker forever; hitting the bound is a logged
/// early stop, not an error.
pub const MAX_DRAIN_BATCHES: usize = 50;

/// How a run selects its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Process exactly the externally supplied item ids, one batch.
    Targeted,
    /// Fetch unfiltered batches until the backlog is empty.
    Draining,
}

/// Lifecycle of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Constructed, nothing started.
    Idle,
    /// Configuration being checked; this is the [`Orchestrator::from_config`]
    /// phase, before any component exists.
    ValidatingConfig,
    /// Fetching and processing items.
    Running(RunMode),
    /// Releasing the rendering engine.
    ShuttingDown,
    /// Finished; the summary has been emitted.
    Done,
}

/// Outcome counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Items captured, stored, and reported successfully.
    pub succeeded: u64,
    /// Items that failed anywhere in their pipeline, including report
    /// delivery.
    pub failed: u64,
}

impl RunSummary {
    /// Total items processed.
    pub fn total(&self) -> u64 {
        self.succeeded + self.failed
    }
}

/// Drives one complete run against the catalog, store, and engine.
pub struct Orchestrator {
    catalog: CatalogClient,
    storage: StorageSink,
    capture: CaptureService,
    targeted_ids: Vec<String>,
    batch_ceiling: usize,
    state: RunState,
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("targeted_ids", &self.targeted_ids)
            .field("batch_ceiling", &self.batch_ceiling)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Validate the configuration and wire up all components.
    ///
    /// Validation runs first: a configuration with missing values is rejected
    /// before any client or engine is constructed.
    ///
    /// # Errors
    ///
    /// [`Error::MissingConfig`] naming every absent value, or
    /// [`Error::Config`] if a component cannot be built from present values.
    pub fn from_config(config: &Config) -> Result<Self> {
        let missing = config.missing_required();
        if !missing.is_empty() {
            return Err(Error::MissingConfig {
                missing: missing.into_iter().map(String::from).collect(),
            });
        }

        let catalog = CatalogClient::new(&config.catalog)?;
        let storage = StorageSink::new(&config.storage)?;
        let capture =
            CaptureService::new(Box::new(ChromiumLauncher::new(config.capture.clone())));

        Ok(Self::new(catalog, storage, capture, config.item_ids.clone()))
    }

    /// Wire an orchestrator from already-built components.
    pub fn new(
        catalog: CatalogClient,
        storage: StorageSink,
        capture: CaptureService,
        targeted_ids: Vec<String>,
    ) -> Self {
        Self {
            catalog,
            storage,
            capture,
            targeted_ids,
            batch_ceiling: MAX_DRAIN_BATCHES,
            state: RunState::Idle,
        }
    }

    /// Shrink the drain ceiling so loop-bound behavior is testable without
    /// fifty round-trips.
    #[cfg(test)]
    pub(crate) fn with_batch_ceiling(mut self, ceiling: usize) -> Self {
        self.batch_ceiling = ceiling;
        self
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Execute the run to completion.
    ///
    /// The engine is released before this returns, on success and on failure
    /// alike. The summary is logged only for completed runs; a fatal error
    /// replaces it.
    ///
    /// # Errors
    ///
    /// Engine acquisition failures and catalog listing failures are fatal and
    /// surface here. Per-item failures do not; they show up in the summary.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let mode = if self.targeted_ids.is_empty() {
            RunMode::Draining
        } else {
            RunMode::Targeted
        };
        self.state = RunState::Running(mode);
        tracing::info!(?mode, "run starting");

        let outcome = self.drive(mode).await;

        self.state = RunState::ShuttingDown;
        self.capture.release().await;
        self.state = RunState::Done;

        let summary = outcome?;
        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            total = summary.total(),
            "run finished"
        );
        Ok(summary)
    }

    async fn drive(&mut self, mode: RunMode) -> Result<RunSummary> {
        self.capture.acquire().await?;
        let mut summary = RunSummary::default();

        match mode {
            RunMode::Targeted => {
                let batch = self.catalog.list_pending(Some(&self.targeted_ids)).await?;
                tracing::info!(
                    requested = self.targeted_ids.len(),
                    pending = batch.items.len(),
                    "targeted batch fetched"
                );
                if batch.items.is_empty() {
                    tracing::warn!("none of the requested items are pending");
                }
                self.process_batch(&batch, &mut summary).await;
            }
            RunMode::Draining => {
                let mut batches = 0usize;
                loop {
                    if batches >= self.batch_ceiling {
                        tracing::warn!(
                            batches,
                            ceiling = self.batch_ceiling,
                            "batch ceiling reached, stopping early"
                        );
                        break;
                    }

                    let batch = self.catalog.list_pending(None).await?;
                    if batch.items.is_empty() {
                        tracing::info!(batches, "backlog drained");
                        break;
                    }

                    batches += 1;
                    tracing::info!(
                        batch = batches,
                        items = batch.items.len(),
                        backlog = batch.total,
                        "processing batch"
                    );
                    self.process_batch(&batch, &mut summary).await;
                }
            }
        }

        Ok(summary)
    }

    /// Process every item in a batch, in catalog order.
    ///
    /// Report delivery failures are absorbed here: the item is counted as
    /// failed and the loop continues.
    async fn process_batch(&mut self, batch: &PendingBatch, summary: &mut RunSummary) {
        for item in &batch.items {
            let payload = self.process_item(item).await;
            let captured = payload.is_success();

            match self.catalog.report(&item.id, &payload).await {
                Ok(()) if captured => summary.succeeded += 1,
                Ok(()) => summary.failed += 1,
                Err(e) => {
                    tracing::warn!(item_id = %item.id, error = %e, "outcome report failed");
                    summary.failed += 1;
                }
            }
        }
    }

    /// Capture and store one item, reducing every failure to a report
    /// payload. A capture failure means no store attempt is made.
    async fn process_item(&mut self, item: &WorkItem) -> ReportPayload {
        tracing::info!(item_id = %item.id, url = %item.url, "processing item");

        let image = match self.capture.capture(&item.url).await {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(item_id = %item.id, error = %e, "capture failed");
                return ReportPayload::failure(e.to_string());
            }
        };

        match self.storage.store(&item.id, image).await {
            Ok(public_url) => {
                tracing::info!(item_id = %item.id, url = %public_url, "artifact stored");
                ReportPayload::success(public_url, Utc::now())
            }
            Err(e) => {
                tracing::warn!(item_id = %item.id, error = %e, "upload failed");
                ReportPayload::failure(e.to_string())
            }
        }
    }
}
