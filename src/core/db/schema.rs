//! Schema Module
//!
//! Table existence checks and the one-time creation of the Movies table.

use crate::core::Result;
use rusqlite::{Connection, OptionalExtension};
use tracing::info;

const MOVIES_TABLE_SQL: &str = r#"
CREATE TABLE MOVIES (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name VARCHAR(255),
    rating INT,
    description VARCHAR(255)
)"#;

/// Returns true when a table with this name exists (names compare case-insensitively).
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
            [table],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Creates the Movies table unless it already exists.
///
/// # Returns
///
/// `true` if the table was created by this call.
pub fn ensure_movies_table(conn: &Connection) -> Result<bool> {
    if table_exists(conn, crate::movies::MOVIES_TABLE)? {
        return Ok(false);
    }
    info!("Creating table {}", crate::movies::MOVIES_TABLE);
    conn.execute(MOVIES_TABLE_SQL, [])?;
    Ok(true)
}
