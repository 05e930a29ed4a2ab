//! Error types for songbook-import
//!
//! Row-level problems (no song, unrecognized pitch, blank pitch) are item
//! statuses, not errors. Errors here are either caller mistakes or failures
//! that stop an operation outright.

use thiserror::Error;

/// Reconciliation error type
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Catalog could not be loaded; the whole import is aborted
    #[error("Import setup failed: {0}")]
    Setup(String),

    /// No preview item with this id in the session
    #[error("Preview item not found: {0}")]
    ItemNotFound(usize),

    /// Invalid request (e.g. mapping to a non-canonical pitch)
    #[error("Invalid request: {0}")]
    InvalidInput(String),

    /// Import text could not be read, or the export could not be written
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Config file could not be loaded or written
    #[error("Config error: {0}")]
    Common(#[from] songbook_common::Error),
}

/// Result type for reconciliation operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;
