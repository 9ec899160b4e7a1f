//! Table Model Module
//!
//! `QueryAdapter` owns one SQLite connection, runs one query at a time on it,
//! and exposes the latest result as a grid addressed by 0-based row and
//! column. Once disconnected, the adapter stays unusable.

use crate::core::db::{materialize, ActiveResult, ConnectionTarget, Value, ValueType};
use crate::core::{MoviesError, Result};
use rusqlite::Connection;
use std::sync::mpsc::Sender;
use tracing::{debug, info, warn};

/// Lifecycle state of a `QueryAdapter`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    Connected,
    Disconnected,
}

/// Notification sent to bound views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableModelEvent {
    /// Both the column layout and the rows may have changed; re-read everything.
    StructureChanged { columns: usize, rows: usize },
}

/// Receives `TableModelEvent`s from a `QueryAdapter`.
pub trait TableModelListener {
    fn table_changed(&mut self, event: TableModelEvent);
}

impl TableModelListener for Sender<TableModelEvent> {
    fn table_changed(&mut self, event: TableModelEvent) {
        // A dropped receiver just means nobody is watching anymore.
        let _ = self.send(event);
    }
}

/// Exposes the result of a caller-supplied query as a positional grid.
pub struct QueryAdapter {
    target: ConnectionTarget,
    connection: Option<Connection>,
    result: ActiveResult,
    listeners: Vec<Box<dyn TableModelListener>>,
}

impl std::fmt::Debug for QueryAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryAdapter")
            .field("target", &self.target)
            .field("state", &self.state())
            .field("columns", &self.result.column_count())
            .field("rows", &self.result.row_count())
            .finish()
    }
}

impl QueryAdapter {
    /// Opens a connection to `descriptor` and returns a connected adapter.
    ///
    /// # Errors
    ///
    /// Returns `MoviesError::Connection` if the descriptor is invalid or the
    /// database cannot be opened.
    pub fn connect(descriptor: &str) -> Result<Self> {
        let target = ConnectionTarget::parse(descriptor)?;
        let connection = target.open()?;
        info!("Connected to {}", target);

        Ok(QueryAdapter {
            target,
            connection: Some(connection),
            result: ActiveResult::default(),
            listeners: Vec::new(),
        })
    }

    pub fn state(&self) -> AdapterState {
        if self.connection.is_some() {
            AdapterState::Connected
        } else {
            AdapterState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state() == AdapterState::Connected
    }

    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    /// The owned connection, for collaborators that write through it.
    pub fn connection(&self) -> Result<&Connection> {
        self.connection.as_ref().ok_or(MoviesError::NotConnected)
    }

    /// Registers a listener for structure-changed notifications.
    pub fn add_listener<L>(&mut self, listener: L)
    where
        L: TableModelListener + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Runs `query` verbatim and replaces the active result with its rows.
    ///
    /// On failure the previous result stays in place.
    ///
    /// # Errors
    ///
    /// - `MoviesError::NotConnected` after `disconnect()`
    /// - `MoviesError::Query` if SQLite rejects the query or it returns no result set
    pub fn run(&mut self, query: &str) -> Result<()> {
        let conn = self.connection()?;
        let result = materialize(conn, query)?;
        info!(
            "Query returned {} columns and {} rows",
            result.column_count(),
            result.row_count()
        );
        self.result = result;
        self.fire_structure_changed();
        Ok(())
    }

    fn fire_structure_changed(&mut self) {
        let event = TableModelEvent::StructureChanged {
            columns: self.result.column_count(),
            rows: self.result.row_count(),
        };
        for listener in &mut self.listeners {
            listener.table_changed(event);
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(MoviesError::NotConnected)
        }
    }

    pub fn column_count(&self) -> Result<usize> {
        self.ensure_connected()?;
        Ok(self.result.column_count())
    }

    /// Returns the column's name, or an empty string when disconnected or
    /// when `column` is out of range. Never fails.
    pub fn column_name(&self, column: usize) -> String {
        if !self.is_connected() {
            return String::new();
        }
        self.result
            .column(column)
            .map(|c| c.name.clone())
            .unwrap_or_default()
    }

    /// Returns the column's value type, falling back to `ValueType::Any` when
    /// it cannot be resolved.
    pub fn column_value_type(&self, column: usize) -> Result<ValueType> {
        self.ensure_connected()?;
        Ok(self.result.column_type(column).unwrap_or(ValueType::Any))
    }

    pub fn row_count(&self) -> Result<usize> {
        self.ensure_connected()?;
        Ok(self.result.row_count())
    }

    /// Returns the value at (`row`, `column`).
    ///
    /// # Errors
    ///
    /// - `MoviesError::NotConnected` after `disconnect()`
    /// - `MoviesError::OutOfRange` if the position is outside the active result
    pub fn value_at(&self, row: usize, column: usize) -> Result<Value> {
        self.ensure_connected()?;
        self.result
            .value(row, column)
            .cloned()
            .ok_or(MoviesError::OutOfRange { row, column })
    }

    /// Like `value_at`, but an invalid position reads as an empty value.
    pub fn value_or_empty(&self, row: usize, column: usize) -> Result<Value> {
        match self.value_at(row, column) {
            Err(MoviesError::OutOfRange { .. }) => Ok(Value::empty()),
            other => other,
        }
    }

    /// Releases the active result, the statement cache and the connection,
    /// in that order. Calling it again is a no-op.
    pub fn disconnect(&mut self) {
        let Some(connection) = self.connection.take() else {
            debug!("disconnect() on an adapter that is already disconnected");
            return;
        };

        self.result = ActiveResult::default();
        connection.flush_prepared_statement_cache();
        if let Err((_, e)) = connection.close() {
            warn!("Failed to close connection to {}: {}", self.target, e);
        }
        info!("Disconnected from {}", self.target);
    }
}

impl Drop for QueryAdapter {
    fn drop(&mut self) {
        self.disconnect();
    }
}
