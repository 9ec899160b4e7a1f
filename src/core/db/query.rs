//! Query Module
//!
//! Executes a query and captures its complete result set in memory so it can
//! be read back by position any number of times without re-querying.

use crate::core::{MoviesError, Result};
use rusqlite::{types::ValueRef, Batch, Connection};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use tracing::debug;

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// The empty value returned by degraded reads
    pub fn empty() -> Self {
        Value::Text(String::new())
    }

    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Value::Null => None,
            Value::Integer(_) => Some(ValueType::Integer),
            Value::Real(_) => Some(ValueType::Real),
            Value::Text(_) => Some(ValueType::Text),
            Value::Blob(_) => Some(ValueType::Blob),
        }
    }

    /// Orders values the way SQLite's ORDER BY does: NULL first, then numbers,
    /// then text, then blobs.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        fn class(value: &Value) -> u8 {
            match value {
                Value::Null => 0,
                Value::Integer(_) | Value::Real(_) => 1,
                Value::Text(_) => 2,
                Value::Blob(_) => 3,
            }
        }

        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Integer(a), Value::Real(b)) => (*a as f64).total_cmp(b),
            (Value::Real(a), Value::Integer(b)) => a.total_cmp(&(*b as f64)),
            (Value::Real(a), Value::Real(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Blob(a), Value::Blob(b)) => a.cmp(b),
            (a, b) => class(a).cmp(&class(b)),
        }
    }

    fn from_sql(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Real(r) => write!(f, "{}", r),
            Value::Text(s) => write!(f, "{}", s),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// The runtime value type associated with a column.
///
/// `Any` is the generic classification used when no better type resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValueType {
    Integer,
    Real,
    Text,
    Blob,
    Any,
}

impl ValueType {
    /// Maps a declared column type to a value type using SQLite's affinity rules.
    pub fn from_declared(declared: &str) -> Option<Self> {
        let declared = declared.to_uppercase();
        if declared.contains("INT") {
            Some(ValueType::Integer)
        } else if ["CHAR", "CLOB", "TEXT"].iter().any(|t| declared.contains(t)) {
            Some(ValueType::Text)
        } else if declared.contains("BLOB") {
            Some(ValueType::Blob)
        } else if ["REAL", "FLOA", "DOUB"].iter().any(|t| declared.contains(t)) {
            Some(ValueType::Real)
        } else {
            None
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Integer => "integer",
            ValueType::Real => "real",
            ValueType::Text => "text",
            ValueType::Blob => "blob",
            ValueType::Any => "any",
        };
        f.write_str(name)
    }
}

/// Column descriptor captured at execution time
#[derive(Debug, Clone, PartialEq)]
pub struct ResultColumn {
    pub name: String,
    /// The declared type from the table definition, if the column has one
    pub declared_type: Option<String>,
}

/// A fully materialized result set: columns, then rows of cells in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveResult {
    columns: Vec<ResultColumn>,
    rows: Vec<Vec<Value>>,
}

impl ActiveResult {
    pub fn new(columns: Vec<ResultColumn>, rows: Vec<Vec<Value>>) -> Self {
        ActiveResult { columns, rows }
    }

    pub fn columns(&self) -> &[ResultColumn] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column(&self, index: usize) -> Option<&ResultColumn> {
        self.columns.get(index)
    }

    pub fn value(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|cells| cells.get(column))
    }

    /// Resolves a column's value type: declared type first, then the first
    /// non-NULL cell. `None` when the index is invalid or nothing resolves.
    pub fn column_type(&self, index: usize) -> Option<ValueType> {
        let column = self.columns.get(index)?;
        column
            .declared_type
            .as_deref()
            .and_then(ValueType::from_declared)
            .or_else(|| {
                self.rows
                    .iter()
                    .filter_map(|cells| cells.get(index))
                    .find_map(Value::value_type)
            })
    }
}

/// Executes `sql` on `conn` and materializes every row.
///
/// The statement goes through the connection's prepared-statement cache, so
/// re-running the same query text reuses the compiled statement.
///
/// # Errors
///
/// Returns `MoviesError::Query` if SQLite rejects the text, if the text holds
/// more than one statement, if the statement would write to the database, if
/// it produces no result columns, or if stepping through the rows fails.
pub fn materialize(conn: &Connection, sql: &str) -> Result<ActiveResult> {
    debug!("Executing query: {}", sql);
    if sql.contains(';') {
        ensure_single_statement(conn, sql)?;
    }

    let mut stmt = conn
        .prepare_cached(sql)
        .map_err(|e| MoviesError::Query(e.to_string()))?;

    if stmt.column_count() == 0 {
        return Err(MoviesError::Query(
            "Statement does not produce a result set".to_string(),
        ));
    }
    if !stmt.readonly() {
        return Err(MoviesError::Query("Statement is not read-only".to_string()));
    }

    let columns: Vec<ResultColumn> = stmt
        .columns()
        .iter()
        .map(|column| ResultColumn {
            name: column.name().to_string(),
            declared_type: column.decl_type().map(String::from),
        })
        .collect();
    let column_count = columns.len();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([]).map_err(|e| MoviesError::Query(e.to_string()))?;
    while let Some(row) = cursor.next().map_err(|e| MoviesError::Query(e.to_string()))? {
        let mut cells = Vec::with_capacity(column_count);
        for i in 0..column_count {
            let value = row.get_ref(i).map_err(|e| MoviesError::Query(e.to_string()))?;
            cells.push(Value::from_sql(value));
        }
        rows.push(cells);
    }

    Ok(ActiveResult::new(columns, rows))
}

/// Fails unless `sql` compiles to exactly one statement. Statements are only
/// prepared here, never stepped; trailing semicolons and comments are fine.
fn ensure_single_statement(conn: &Connection, sql: &str) -> Result<()> {
    let mut batch = Batch::new(conn, sql);
    let mut statements = 0;
    while batch
        .next()
        .map_err(|e| MoviesError::Query(e.to_string()))?
        .is_some()
    {
        statements += 1;
        if statements > 1 {
            return Err(MoviesError::Query(
                "Only one statement can be run at a time".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE t (a INT, b VARCHAR(20), c DOUBLE, d BLOB, e);
            INSERT INTO t VALUES (1, 'one', 1.5, x'0102', NULL);
            INSERT INTO t VALUES (2, 'two', 2.5, NULL, 'late');
        ",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_materialize_captures_shape_and_values() {
        let conn = sample_connection();
        let result = materialize(&conn, "SELECT * FROM t").unwrap();

        assert_eq!(result.column_count(), 5);
        assert_eq!(result.row_count(), 2);
        assert_eq!(result.column(1).unwrap().name, "b");
        assert_eq!(result.value(0, 0), Some(&Value::Integer(1)));
        assert_eq!(result.value(1, 1), Some(&Value::Text("two".to_string())));
        assert_eq!(result.value(0, 3), Some(&Value::Blob(vec![1, 2])));
        assert_eq!(result.value(2, 0), None);
        assert_eq!(result.value(0, 5), None);
    }

    #[test]
    fn test_column_type_resolution() {
        let conn = sample_connection();
        let result = materialize(&conn, "SELECT a, b, c, d, e, a + 1 AS f FROM t").unwrap();

        assert_eq!(result.column_type(0), Some(ValueType::Integer));
        assert_eq!(result.column_type(1), Some(ValueType::Text));
        assert_eq!(result.column_type(2), Some(ValueType::Real));
        assert_eq!(result.column_type(3), Some(ValueType::Blob));
        // Undeclared column: first non-NULL cell decides
        assert_eq!(result.column_type(4), Some(ValueType::Text));
        // Expression column: inferred from data
        assert_eq!(result.column_type(5), Some(ValueType::Integer));
        assert_eq!(result.column_type(6), None);
    }

    #[test]
    fn test_materialize_rejects_statements_without_result_set() {
        let conn = sample_connection();
        match materialize(&conn, "DELETE FROM t") {
            Err(MoviesError::Query(msg)) => assert!(msg.contains("result set")),
            other => panic!("Expected Query error, got {:?}", other),
        }
        // Nothing ran
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_materialize_rejects_writes_with_result_set() {
        let conn = sample_connection();
        match materialize(&conn, "DELETE FROM t RETURNING a") {
            Err(MoviesError::Query(msg)) => assert!(msg.contains("read-only")),
            other => panic!("Expected Query error, got {:?}", other),
        }
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_materialize_rejects_trailing_statements() {
        let conn = sample_connection();
        match materialize(&conn, "SELECT a FROM t; DELETE FROM t") {
            Err(MoviesError::Query(msg)) => assert!(msg.contains("one statement")),
            other => panic!("Expected Query error, got {:?}", other),
        }
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 2);

        // A terminating semicolon, a trailing comment or a quoted ';' is still one statement
        assert_eq!(materialize(&conn, "SELECT a FROM t;").unwrap().row_count(), 2);
        assert_eq!(materialize(&conn, "SELECT a FROM t; -- all of them").unwrap().row_count(), 2);
        let quoted = materialize(&conn, "SELECT 'a;b' AS s").unwrap();
        assert_eq!(quoted.value(0, 0), Some(&Value::Text("a;b".to_string())));
    }

    #[test]
    fn test_materialize_reports_driver_message() {
        let conn = sample_connection();
        match materialize(&conn, "SELECT * FROM nonexistent_table") {
            Err(MoviesError::Query(msg)) => assert!(msg.contains("no such table")),
            other => panic!("Expected Query error, got {:?}", other),
        }
    }

    #[test]
    fn test_declared_affinity() {
        assert_eq!(ValueType::from_declared("BIGINT"), Some(ValueType::Integer));
        assert_eq!(ValueType::from_declared("varchar(255)"), Some(ValueType::Text));
        assert_eq!(ValueType::from_declared("FLOAT"), Some(ValueType::Real));
        assert_eq!(ValueType::from_declared("NUMERIC"), None);
    }

    #[test]
    fn test_sort_order_matches_sqlite() {
        let mut values = vec![
            Value::Text("b".to_string()),
            Value::Integer(3),
            Value::Null,
            Value::Real(2.5),
            Value::Blob(vec![0]),
            Value::Text("a".to_string()),
        ];
        values.sort_by(|a, b| a.sort_cmp(b));
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Real(2.5),
                Value::Integer(3),
                Value::Text("a".to_string()),
                Value::Text("b".to_string()),
                Value::Blob(vec![0]),
            ]
        );
    }

    #[test]
    fn test_value_display_and_json() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Integer(9).to_string(), "9");
        assert_eq!(Value::Blob(vec![1, 2, 3]).to_string(), "<3 bytes>");
        assert_eq!(serde_json::to_string(&Value::Integer(9)).unwrap(), "9");
        assert_eq!(serde_json::to_string(&Value::Null).unwrap(), "null");
        assert_eq!(
            serde_json::to_string(&Value::Text("Inception".to_string())).unwrap(),
            "\"Inception\""
        );
    }
}
