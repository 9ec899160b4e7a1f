//! Core Module
//!
//! Shared infrastructure for the movies application: database access
//! (connection targets, schema bootstrap, result materialization) and the
//! error type every layer propagates.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{MoviesError, Result};
