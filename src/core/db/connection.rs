//! Connection Module
//!
//! Resolves a connection target descriptor (a `sqlite:` URL) and opens the
//! SQLite connection it names.

use crate::core::{MoviesError, Result};
use rusqlite::{Connection, OpenFlags};
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

const SCHEME: &str = "sqlite:";
const MEMORY: &str = ":memory:";

/// How a file database is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Read only; the file must exist
    ReadOnly,
    /// Read and write; the file must exist
    ReadWrite,
    /// Read and write, creating the file when missing
    ReadWriteCreate,
}

impl Default for OpenMode {
    fn default() -> Self {
        OpenMode::ReadWriteCreate
    }
}

impl OpenMode {
    fn parse(value: &str) -> Result<Self> {
        match value {
            "ro" => Ok(OpenMode::ReadOnly),
            "rw" => Ok(OpenMode::ReadWrite),
            "rwc" => Ok(OpenMode::ReadWriteCreate),
            other => Err(MoviesError::Connection(format!(
                "Unsupported open mode '{}'. Supported modes: ro, rw, rwc",
                other
            ))),
        }
    }

    fn flags(self) -> OpenFlags {
        let access = match self {
            OpenMode::ReadOnly => OpenFlags::SQLITE_OPEN_READ_ONLY,
            OpenMode::ReadWrite => OpenFlags::SQLITE_OPEN_READ_WRITE,
            OpenMode::ReadWriteCreate => {
                OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
            }
        };
        access | OpenFlags::SQLITE_OPEN_NO_MUTEX
    }
}

/// A parsed connection target descriptor.
///
/// Accepted forms:
/// - `sqlite::memory:`
/// - `sqlite:<path>` and `sqlite://<path>`, optionally followed by `?mode=ro|rw|rwc`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionTarget {
    Memory,
    File { path: PathBuf, mode: OpenMode },
}

impl ConnectionTarget {
    /// Parses a descriptor string.
    ///
    /// # Errors
    ///
    /// Returns `MoviesError::Connection` when the descriptor does not use the
    /// `sqlite:` scheme, names no path, or carries an unknown option.
    pub fn parse(descriptor: &str) -> Result<Self> {
        let rest = descriptor.strip_prefix(SCHEME).ok_or_else(|| {
            MoviesError::Connection(format!("No suitable driver found for '{}'", descriptor))
        })?;

        if rest == MEMORY {
            return Ok(ConnectionTarget::Memory);
        }

        let rest = rest.strip_prefix("//").unwrap_or(rest);
        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };
        if path.is_empty() {
            return Err(MoviesError::Connection(format!(
                "Missing database path in '{}'",
                descriptor
            )));
        }

        let mut mode = OpenMode::default();
        for option in query.into_iter().flat_map(|q| q.split('&')) {
            match option.split_once('=') {
                Some(("mode", value)) => mode = OpenMode::parse(value)?,
                _ => {
                    return Err(MoviesError::Connection(format!(
                        "Unsupported connection option '{}'",
                        option
                    )))
                }
            }
        }

        Ok(ConnectionTarget::File {
            path: PathBuf::from(path),
            mode,
        })
    }

    /// Opens a new SQLite connection to this target.
    pub fn open(&self) -> Result<Connection> {
        let conn = match self {
            ConnectionTarget::Memory => Connection::open_in_memory(),
            ConnectionTarget::File { path, mode } => {
                Connection::open_with_flags(path, mode.flags())
            }
        }
        .map_err(|e| MoviesError::Connection(format!("Unable to open {}: {}", self, e)))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| MoviesError::Connection(format!("Unable to configure {}: {}", self, e)))?;

        debug!("Opened connection to {}", self);
        Ok(conn)
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionTarget::Memory => write!(f, "{}{}", SCHEME, MEMORY),
            ConnectionTarget::File { path, .. } => write!(f, "{}{}", SCHEME, path.display()),
        }
    }
}

/// Convenience function: parse a descriptor and open it in one step.
pub fn open_connection(descriptor: &str) -> Result<Connection> {
    ConnectionTarget::parse(descriptor)?.open()
}
