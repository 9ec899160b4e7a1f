//! Results Grid Module
//!
//! Renders a `QueryAdapter`'s current result as plain text, sorts the
//! displayed rows without re-querying, and exports the grid.

use crate::core::db::{Value, ValueType};
use crate::core::{MoviesError, Result};
use crate::table_model::QueryAdapter;
use serde_json::{Map, Value as JsonValue};
use std::cmp::Ordering;

/// Represents a single cell in the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: Value,
    pub content: String,
}

/// Represents a row of cells in the grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub cells: Vec<Cell>,
    /// Position of this row in the adapter's result, before any sorting
    pub row_index: usize,
}

/// A column header with the value type the adapter reported for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub name: String,
    pub value_type: ValueType,
}

/// Sort applied to the displayed rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: usize,
    pub ascending: bool,
}

/// Represents the entire grid structure.
#[derive(Debug, Clone, Default)]
pub struct ResultsGrid {
    pub headers: Vec<Header>,
    pub rows: Vec<Row>,
    pub sort: Option<SortKey>,
}

impl ResultsGrid {
    /// Creates a new, empty ResultsGrid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-reads structure and data from the adapter.
    pub fn from_model(model: &QueryAdapter) -> Result<Self> {
        let column_count = model.column_count()?;
        let row_count = model.row_count()?;

        let mut headers = Vec::with_capacity(column_count);
        for column in 0..column_count {
            headers.push(Header {
                name: model.column_name(column),
                value_type: model.column_value_type(column)?,
            });
        }

        let mut rows = Vec::with_capacity(row_count);
        for row_index in 0..row_count {
            let mut cells = Vec::with_capacity(column_count);
            for column in 0..column_count {
                let value = model.value_at(row_index, column)?;
                cells.push(Cell {
                    content: value.to_string(),
                    value,
                });
            }
            rows.push(Row { cells, row_index });
        }

        Ok(ResultsGrid {
            headers,
            rows,
            sort: None,
        })
    }

    /// Finds a column by name (case-insensitive) or by 0-based index.
    pub fn resolve_column(&self, key: &str) -> Result<usize> {
        if let Some(position) = self
            .headers
            .iter()
            .position(|h| h.name.eq_ignore_ascii_case(key))
        {
            return Ok(position);
        }
        match key.parse::<usize>() {
            Ok(index) if index < self.headers.len() => Ok(index),
            _ => Err(MoviesError::Ui(format!("Unknown column '{}'", key))),
        }
    }

    /// Sorts the displayed rows by one column. Ties keep their current order.
    pub fn sort_by(&mut self, column: usize, ascending: bool) -> Result<()> {
        if column >= self.headers.len() {
            return Err(MoviesError::Ui(format!("Unknown column '{}'", column)));
        }
        self.rows.sort_by(|a, b| {
            let ordering = compare_cells(a, b, column);
            if ascending {
                ordering
            } else {
                ordering.reverse()
            }
        });
        self.sort = Some(SortKey { column, ascending });
        Ok(())
    }

    fn column_widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.cells.get(i))
                    .map(|cell| cell.content.chars().count())
                    .chain(std::iter::once(header.name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect()
    }

    /// Renders the grid as aligned text with a header, a rule and a row count.
    pub fn render(&self) -> String {
        self.render_table(true)
    }

    /// Renders the grid, optionally followed by the `(N rows)` footer.
    pub fn render_table(&self, row_count: bool) -> String {
        if self.headers.is_empty() {
            return String::new();
        }

        let widths = self.column_widths();
        let mut output = String::new();

        let header_cells: Vec<&str> = self.headers.iter().map(|h| h.name.as_str()).collect();
        output.push_str(&render_line(&header_cells, &widths));
        output.push('\n');
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        output.push_str(&rule.join("-+-"));
        output.push('\n');

        for row in &self.rows {
            let cells: Vec<&str> = row.cells.iter().map(|c| c.content.as_str()).collect();
            output.push_str(&render_line(&cells, &widths));
            output.push('\n');
        }

        if row_count {
            let noun = if self.rows.len() == 1 { "row" } else { "rows" };
            output.push_str(&format!("({} {})\n", self.rows.len(), noun));
        }
        output
    }

    /// Exports the grid data to a specified format.
    /// Supported formats: CSV, JSON, Markdown.
    pub fn export(&self, format: &str) -> Result<String> {
        match format.to_lowercase().as_str() {
            "csv" => Ok(self.export_to_csv()),
            "json" => self.export_to_json(),
            "markdown" | "md" => Ok(self.export_to_markdown()),
            _ => Err(MoviesError::Ui(format!(
                "Unsupported export format: '{}'. Supported formats: csv, json, markdown",
                format
            ))),
        }
    }

    fn export_to_csv(&self) -> String {
        let mut output = String::new();
        let headers: Vec<String> = self.headers.iter().map(|h| csv_field(&h.name)).collect();
        output.push_str(&headers.join(","));
        output.push('\n');
        for row in &self.rows {
            let fields: Vec<String> = row
                .cells
                .iter()
                .map(|cell| match cell.value {
                    Value::Null => String::new(),
                    _ => csv_field(&cell.content),
                })
                .collect();
            output.push_str(&fields.join(","));
            output.push('\n');
        }
        output
    }

    fn export_to_json(&self) -> Result<String> {
        let mut rows = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let mut object = Map::new();
            for (header, cell) in self.headers.iter().zip(&row.cells) {
                object.insert(header.name.clone(), serde_json::to_value(&cell.value)?);
            }
            rows.push(JsonValue::Object(object));
        }
        Ok(serde_json::to_string(&rows)?)
    }

    fn export_to_markdown(&self) -> String {
        let mut output = String::new();
        let headers: Vec<&str> = self.headers.iter().map(|h| h.name.as_str()).collect();
        output.push_str(&format!("| {} |\n", headers.join(" | ")));
        let rule: Vec<String> = headers
            .iter()
            .map(|h| "-".repeat(h.chars().count().max(3)))
            .collect();
        output.push_str(&format!("| {} |\n", rule.join(" | ")));
        for row in &self.rows {
            let cells: Vec<String> = row
                .cells
                .iter()
                .map(|c| c.content.replace('|', "\\|"))
                .collect();
            output.push_str(&format!("| {} |\n", cells.join(" | ")));
        }
        output
    }
}

fn compare_cells(a: &Row, b: &Row, column: usize) -> Ordering {
    match (a.cells.get(column), b.cells.get(column)) {
        (Some(x), Some(y)) => x.value.sort_cmp(&y.value),
        _ => Ordering::Equal,
    }
}

// The last column is left unpadded so lines carry no trailing spaces.
fn render_line(cells: &[&str], widths: &[usize]) -> String {
    let last = cells.len().saturating_sub(1);
    cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (cell, width))| {
            if i == last {
                cell.to_string()
            } else {
                format!("{:<width$}", cell, width = *width)
            }
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

fn csv_field(field: &str) -> String {
    if field.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
