//! # Songbook Common Library
//!
//! Shared code for the songbook import tooling:
//! - Error and result types
//! - TOML configuration loading and atomic write-back

pub mod config;
pub mod error;

pub use error::{Error, Result};
