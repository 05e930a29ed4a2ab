//! songbook-import library interface
//!
//! Reconciles singer/song/pitch rows from an external spreadsheet against the
//! songbook catalog before committing pitch records.

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod workflow;

pub use crate::client::{CatalogStore, Lookup, MappingStore, MemoryStore, RestClient, StoreError};
pub use crate::error::{ReconcileError, ReconcileResult};
pub use crate::workflow::ReconciliationSession;
