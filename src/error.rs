//! Error types for snapfill
//!
//! Run-level failures (configuration, catalog listing) use the top-level
//! [`Error`] and end the run. Per-item failures (capture, storage, report)
//! use their own enums and stay inside the item that raised them: the
//! orchestrator reduces them to reported outcomes instead of propagating.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for snapfill operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for snapfill
///
/// Everything that reaches this type is fatal to the run. Per-item errors
/// only appear here wrapped, when they escape item isolation (for example an
/// engine launch failure during pre-flight acquisition).
#[derive(Debug, Error)]
pub enum Error {
    /// Required configuration values are absent or blank
    #[error("configuration error: missing required values: {}", missing.join(", "))]
    MissingConfig {
        /// Environment variable names that were absent or blank
        missing: Vec<String>,
    },

    /// Configuration was present but a component could not be built from it
    #[error("configuration error: {0}")]
    Config(String),

    /// Catalog API failure
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Capture failure that escaped per-item isolation
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Storage failure that escaped per-item isolation
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Catalog API errors
///
/// Listing failures are fatal to the run (the backlog cannot be discovered);
/// report failures are counted against the item and swallowed by the caller.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Request could not be sent or its body could not be read or decoded
    #[error("catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Listing call returned a non-success status
    #[error("catalog list failed with status {status}: {body}")]
    ListFailed {
        /// HTTP status code returned by the catalog
        status: u16,
        /// Response body text, as returned by the catalog
        body: String,
    },

    /// Listing call returned 200 but flagged the response as unsuccessful
    #[error("catalog list reported failure: {0}")]
    ListRejected(String),

    /// Report call returned a non-success status
    #[error("catalog report for item {item_id} failed with status {status}: {body}")]
    ReportFailed {
        /// Item whose report was rejected
        item_id: String,
        /// HTTP status code returned by the catalog
        status: u16,
        /// Response body text, as returned by the catalog
        body: String,
    },
}

/// Capture pipeline errors
///
/// Every variant reduces to one item's failure reason; nothing here is
/// retried.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Target address failed URL validation
    #[error("invalid target address {address}: {reason}")]
    InvalidAddress {
        /// The address as received from the catalog
        address: String,
        /// Why it did not parse
        reason: String,
    },

    /// Rendering engine failed to launch
    #[error("failed to launch rendering engine: {0}")]
    Launch(String),

    /// The engine handle was already released; a run never reopens it
    #[error("rendering engine already released")]
    EngineClosed,

    /// Could not open a fresh rendering context for this capture
    #[error("failed to open rendering context: {0}")]
    Context(String),

    /// Navigation to the target failed
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Navigation did not finish within the bound
    #[error("navigation timed out after {0:?}")]
    NavigationTimeout(Duration),

    /// Screenshot capture failed after navigation settled
    #[error("screenshot capture failed: {0}")]
    Screenshot(String),

    /// Engine shutdown reported a failure
    #[error("rendering engine shutdown failed: {0}")]
    Shutdown(String),
}

/// Storage sink errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Upload to the artifact bucket failed
    #[error("failed to store artifact {key}: {source}")]
    Upload {
        /// Object key that was being written
        key: String,
        /// Underlying object-store error
        #[source]
        source: object_store::Error,
    },
}
