//! Centralized error handling for m3u-sieve
//!
//! Errors are split by layer so that callers can decide what is recoverable:
//!
//! - **Source Errors**: fetching playlist bodies over HTTP
//! - **Store Errors**: settings, favorites and usage statistics persistence
//! - **Validation Errors**: caller input rejected before any pipeline stage runs
//!
//! Link tests never surface errors at all; they fold every network failure
//! into a [`crate::models::TestResult`].
//!
//! # Usage
//!
//! ```rust
//! use m3u_sieve::errors::{AppError, AppResult};
//!
//! fn require_links(links: &[String]) -> AppResult<()> {
//!     if links.is_empty() {
//!         return Err(AppError::validation("at least one link is required"));
//!     }
//!     Ok(())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for store Results
pub type StoreResult<T> = Result<T, StoreError>;

/// Convenience type alias for Source Results
pub type SourceResult<T> = Result<T, SourceError>;
