//! Database Module
//!
//! The database layer is split into three concerns:
//! - **Connection** (`connection.rs`): parses connection target descriptors and opens SQLite
//! - **Schema** (`schema.rs`): table existence checks and the Movies table bootstrap
//! - **Query** (`query.rs`): executes a query and materializes its result set in memory
//!
//! All operations return the crate-wide `MoviesError`.

pub mod connection;
pub mod query;
pub mod schema;

pub use connection::*;
pub use query::*;
pub use schema::*;
