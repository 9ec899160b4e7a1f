//! Movies Module
//!
//! Validation of the add-movie form and the parameterized insert behind it.

use crate::core::{MoviesError, Result};
use rusqlite::Connection;
use tracing::debug;

/// Name of the table the application displays
pub const MOVIES_TABLE: &str = "MOVIES";

/// Query used for the initial load and after every successful insert
pub const DEFAULT_QUERY: &str = "SELECT * FROM MOVIES";

const INSERT_MOVIE_SQL: &str = "INSERT INTO MOVIES (name, rating, description) VALUES (?1, ?2, ?3)";

pub const MISSING_FIELDS_MESSAGE: &str =
    "All fields must be filled out and the rating must be a value from 1 - 10";
pub const BAD_RATING_MESSAGE: &str = "Enter a rating from 1 to 10";

/// Which check rejected a form submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryProblem {
    MissingFields,
    BadRating,
}

impl EntryProblem {
    pub fn message(self) -> &'static str {
        match self {
            EntryProblem::MissingFields => MISSING_FIELDS_MESSAGE,
            EntryProblem::BadRating => BAD_RATING_MESSAGE,
        }
    }
}

impl From<EntryProblem> for MoviesError {
    fn from(problem: EntryProblem) -> Self {
        MoviesError::Validation(problem.message().to_string())
    }
}

/// A validated add-movie form. Fields are stored exactly as entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieEntry {
    title: String,
    rating: String,
    description: String,
}

impl MovieEntry {
    /// Checks the three form fields.
    ///
    /// Every field must be non-empty, and the rating must parse as an integer
    /// from 1 to 10.
    pub fn validate(
        title: &str,
        rating: &str,
        description: &str,
    ) -> std::result::Result<Self, EntryProblem> {
        if title.is_empty() || rating.is_empty() || description.is_empty() {
            return Err(EntryProblem::MissingFields);
        }

        match rating.parse::<i32>() {
            Ok(value) if (1..=10).contains(&value) => {}
            _ => return Err(EntryProblem::BadRating),
        }

        Ok(MovieEntry {
            title: title.to_string(),
            rating: rating.to_string(),
            description: description.to_string(),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn rating(&self) -> &str {
        &self.rating
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Inserts a validated entry, binding all three fields as strings.
///
/// # Returns
///
/// The rowid of the new movie.
pub fn insert_movie(conn: &Connection, entry: &MovieEntry) -> Result<i64> {
    let mut stmt = conn.prepare_cached(INSERT_MOVIE_SQL)?;
    stmt.execute([entry.title(), entry.rating(), entry.description()])?;
    let id = conn.last_insert_rowid();
    debug!("Inserted movie '{}' with id {}", entry.title(), id);
    Ok(id)
}
