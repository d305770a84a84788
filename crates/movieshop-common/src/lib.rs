//! Movieshop Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the movieshop ETL workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`EtlError`] and the crate-wide [`Result`] alias
//! - **Logging**: `tracing` subscriber setup shared by every binary
//! - **Checksums**: SHA-256 helpers used to verify table data files
//! - **Types**: record lifecycle status, write modes and pipeline entities
//!
//! # Example
//!
//! ```no_run
//! use movieshop_common::{RecordStatus, Result};
//!
//! fn promote(status: RecordStatus) -> Result<RecordStatus> {
//!     status.transition_to(RecordStatus::Loaded)
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{EtlError, Result};
pub use types::{Entity, RecordStatus, WriteMode};
