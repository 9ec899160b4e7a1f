//! Movies Error Module
//!
//! This module defines the error types for the movies application. Connection
//! and query failures propagate to the caller as explicit errors; the adapter
//! never prints and swallows a driver failure.

use thiserror::Error;

/// Comprehensive error type for the movies application.
///
/// This enum covers:
/// - Opening and closing the database connection
/// - Operations attempted after the adapter was disconnected
/// - Query execution and positional access into the active result
/// - Movie form validation
/// - Configuration, I/O and export formats
#[derive(Error, Debug)]
pub enum MoviesError {
    /// The connection target could not be resolved or opened
    #[error("Connection error: {0}")]
    Connection(String),

    /// An operation that needs a live connection ran after `disconnect()`
    #[error("Not Connected to Database")]
    NotConnected,

    /// The database rejected the query text, or it produced no result set
    #[error("Query error: {0}")]
    Query(String),

    /// Positional access outside the active result
    #[error("Position out of range: row {row}, column {column}")]
    OutOfRange { row: usize, column: usize },

    /// Movie form input rejected before reaching the database
    #[error("{0}")]
    Validation(String),

    /// Other errors reported by SQLite
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// UI-related errors (export formats, unknown columns)
    #[error("UI error: {0}")]
    Ui(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Type alias for Result to use MoviesError as the error type.
pub type Result<T> = std::result::Result<T, MoviesError>;
