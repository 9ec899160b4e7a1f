// Core infrastructure modules
pub mod core;

// Feature-specific modules
pub mod config;
pub mod movies;
pub mod repl;
pub mod results_grid;
pub mod table_model;

#[cfg(test)]
mod test_utils;

pub use table_model::QueryAdapter;
