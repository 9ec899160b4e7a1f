//! Test Utilities Module
//!
//! Fixtures shared by the unit tests: a `QueryAdapter` connected to a fresh
//! file-backed database with the Movies table already created.

use crate::core::db::ensure_movies_table;
use crate::core::Result;
use crate::movies::{insert_movie, MovieEntry};
use crate::table_model::QueryAdapter;
use tempfile::TempDir;

/// Isolated database test fixture
pub struct MoviesFixture {
    pub adapter: QueryAdapter,
    // Dropped after the adapter so the connection closes before the file goes.
    _dir: TempDir,
}

impl MoviesFixture {
    /// Creates a temporary database with an empty Movies table
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let url = format!("sqlite:{}", dir.path().join("movies.db").display());
        let adapter = QueryAdapter::connect(&url)?;
        ensure_movies_table(adapter.connection()?)?;

        Ok(MoviesFixture { adapter, _dir: dir })
    }

    /// Inserts a movie, panicking on invalid input (test data is trusted)
    pub fn insert(&mut self, title: &str, rating: &str, description: &str) -> i64 {
        let entry = MovieEntry::validate(title, rating, description)
            .unwrap_or_else(|problem| panic!("invalid fixture movie: {:?}", problem));
        insert_movie(self.adapter.connection().unwrap(), &entry).unwrap()
    }
}
