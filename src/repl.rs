//! Shell Module
//!
//! The line-oriented movies shell: command parsing, alerts, and the loop that
//! drives a `QueryAdapter` from user input.

use crate::core::db::ensure_movies_table;
use crate::core::{MoviesError, Result};
use crate::movies::{insert_movie, EntryProblem, MovieEntry};
use crate::results_grid::ResultsGrid;
use crate::table_model::{QueryAdapter, TableModelEvent};
use std::fmt;
use std::io::{BufRead, Write};
use std::sync::mpsc::{self, Receiver};
use tracing::{debug, info};

/// Represents a parsed shell command.
#[derive(Debug, PartialEq)]
pub enum Command {
    Add {
        title: String,
        rating: String,
        description: String,
    },
    /// Run the given SQL, or the query buffer when `None`
    Query(Option<String>),
    Show,
    Sort { column: String, ascending: bool },
    Export(String),
    Help,
    Quit,
    Unknown(String),
}

/// Parses a user input string into a corresponding `Command`.
///
/// If the input starts with a colon (`:`), it is interpreted as a command.
/// Otherwise, it is treated as a SQL query; blank input re-runs the query buffer.
pub fn parse_command(input: &str) -> Command {
    let input = input.trim();
    if input.is_empty() {
        return Command::Query(None);
    }
    let Some(trimmed) = input.strip_prefix(':') else {
        return Command::Query(Some(input.to_string()));
    };
    let (name, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (trimmed, ""),
    };

    match name {
        "add" => {
            // Missing fields stay empty so validation reports them.
            let mut fields = rest.splitn(3, '|').map(|f| f.trim().to_string());
            Command::Add {
                title: fields.next().unwrap_or_default(),
                rating: fields.next().unwrap_or_default(),
                description: fields.next().unwrap_or_default(),
            }
        }
        "query" => {
            if rest.is_empty() {
                Command::Query(None)
            } else {
                Command::Query(Some(rest.to_string()))
            }
        }
        "show" => Command::Show,
        "sort" => {
            let parts: Vec<&str> = rest.split_whitespace().collect();
            match parts.as_slice() {
                [column] => Command::Sort {
                    column: column.to_string(),
                    ascending: true,
                },
                [column, "asc"] => Command::Sort {
                    column: column.to_string(),
                    ascending: true,
                },
                [column, "desc"] => Command::Sort {
                    column: column.to_string(),
                    ascending: false,
                },
                _ => Command::Unknown(input.to_string()),
            }
        }
        "export" => {
            if rest.is_empty() {
                Command::Unknown(input.to_string())
            } else {
                Command::Export(rest.to_string())
            }
        }
        "help" => Command::Help,
        "quit" | "q" => Command::Quit,
        _ => Command::Unknown(input.to_string()),
    }
}

/// An error shown to the user: a short title and a detailed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn new(title: &str, message: &str) -> Self {
        Alert {
            title: title.to_string(),
            message: message.to_string(),
        }
    }

    /// A "Database Error" alert carrying the driver's own message.
    pub fn database(err: MoviesError) -> Self {
        let message = match err {
            MoviesError::Query(msg) | MoviesError::Connection(msg) => msg,
            other => other.to_string(),
        };
        Alert {
            title: "Database Error".to_string(),
            message,
        }
    }
}

impl From<EntryProblem> for Alert {
    fn from(problem: EntryProblem) -> Self {
        let title = match problem {
            EntryProblem::MissingFields => "Invalid Entry!",
            EntryProblem::BadRating => "Invalid Entry",
        };
        Alert::new(title, problem.message())
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

/// Whether the shell loop keeps reading input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellFlow {
    Continue,
    Exit,
}

/// The movies view: an adapter, the grid bound to it, and the query buffer.
pub struct MoviesShell {
    adapter: QueryAdapter,
    events: Receiver<TableModelEvent>,
    grid: ResultsGrid,
    default_query: String,
    query_text: String,
    show_row_count: bool,
}

impl MoviesShell {
    /// Connects, creates the Movies table if needed and loads `default_query`.
    pub fn open(descriptor: &str, default_query: &str) -> Result<Self> {
        let mut adapter = QueryAdapter::connect(descriptor)?;
        if let Err(e) = Self::bootstrap(&mut adapter, default_query) {
            adapter.disconnect();
            return Err(e);
        }

        let (tx, events) = mpsc::channel();
        adapter.add_listener(tx);
        let grid = ResultsGrid::from_model(&adapter)?;

        Ok(MoviesShell {
            adapter,
            events,
            grid,
            default_query: default_query.to_string(),
            query_text: default_query.to_string(),
            show_row_count: true,
        })
    }

    fn bootstrap(adapter: &mut QueryAdapter, default_query: &str) -> Result<()> {
        ensure_movies_table(adapter.connection()?)?;
        adapter.run(default_query)
    }

    pub fn with_row_count(mut self, show: bool) -> Self {
        self.show_row_count = show;
        self
    }

    pub fn adapter(&self) -> &QueryAdapter {
        &self.adapter
    }

    pub fn grid(&self) -> &ResultsGrid {
        &self.grid
    }

    /// The query the next bare `:query` submits
    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    /// Rebuilds the grid if the adapter reported a structure change.
    fn refresh(&mut self) -> std::result::Result<(), Alert> {
        let mut changed = false;
        while let Ok(event) = self.events.try_recv() {
            debug!("Table model event: {:?}", event);
            changed = true;
        }
        if changed {
            self.grid = ResultsGrid::from_model(&self.adapter).map_err(Alert::database)?;
        }
        Ok(())
    }

    /// Runs `sql` (or the query buffer). A failed query stays in the buffer;
    /// a successful one resets it to the default query.
    pub fn submit_query(&mut self, sql: Option<&str>) -> std::result::Result<(), Alert> {
        if let Some(sql) = sql {
            self.query_text = sql.to_string();
        }
        let sql = self.query_text.clone();
        self.adapter.run(&sql).map_err(Alert::database)?;
        self.query_text = self.default_query.clone();
        self.refresh()
    }

    /// Validates the form fields, inserts the movie and reloads the default query.
    pub fn add_movie(
        &mut self,
        title: &str,
        rating: &str,
        description: &str,
    ) -> std::result::Result<(), Alert> {
        let entry = MovieEntry::validate(title, rating, description)?;
        let conn = self.adapter.connection().map_err(Alert::database)?;
        insert_movie(conn, &entry).map_err(Alert::database)?;
        info!("Added movie '{}'", entry.title());

        let default_query = self.default_query.clone();
        self.adapter.run(&default_query).map_err(Alert::database)?;
        self.refresh()
    }

    pub fn sort(&mut self, column: &str, ascending: bool) -> std::result::Result<(), Alert> {
        let index = self
            .grid
            .resolve_column(column)
            .map_err(|e| Alert::new("Invalid Column", &e.to_string()))?;
        self.grid
            .sort_by(index, ascending)
            .map_err(|e| Alert::new("Invalid Column", &e.to_string()))
    }

    pub fn render(&self) -> String {
        self.grid.render_table(self.show_row_count)
    }

    pub fn export(&self, format: &str) -> std::result::Result<String, Alert> {
        self.grid
            .export(format)
            .map_err(|e| Alert::new("Export Error", &e.to_string()))
    }

    /// Executes one command, writing its output (or an alert) to `out`.
    pub fn execute<W: Write>(&mut self, command: Command, out: &mut W) -> Result<ShellFlow> {
        let outcome: std::result::Result<Option<String>, Alert> = match command {
            Command::Quit => return Ok(ShellFlow::Exit),
            Command::Help => {
                write_help(out)?;
                Ok(None)
            }
            Command::Show => Ok(Some(self.render())),
            Command::Add {
                title,
                rating,
                description,
            } => self
                .add_movie(&title, &rating, &description)
                .map(|()| Some(format!("Added movie '{}'.\n{}", title, self.render()))),
            Command::Query(sql) => self
                .submit_query(sql.as_deref())
                .map(|()| Some(self.render())),
            Command::Sort { column, ascending } => self
                .sort(&column, ascending)
                .map(|()| Some(self.render())),
            Command::Export(format) => self.export(&format).map(Some),
            Command::Unknown(input) => Err(Alert::new(
                "Unknown Command",
                &format!("'{}' (type :help for a list of commands)", input),
            )),
        };

        match outcome {
            Ok(Some(text)) => write!(out, "{}", text)?,
            Ok(None) => {}
            Err(alert) => writeln!(out, "{}", alert)?,
        }
        Ok(ShellFlow::Continue)
    }

    /// Disconnects the adapter.
    pub fn close(mut self) {
        self.adapter.disconnect();
    }
}

fn write_help<W: Write>(out: &mut W) -> Result<()> {
    writeln!(out, "Available commands:")?;
    writeln!(out, "  :add <title> | <rating> | <description> - Add a movie (rating 1 - 10)")?;
    writeln!(out, "  :query [sql] - Run a SELECT query (no argument: retry the last failed one)")?;
    writeln!(out, "  :show - Show the current results")?;
    writeln!(out, "  :sort <column> [asc|desc] - Sort the displayed rows")?;
    writeln!(out, "  :export <csv|json|markdown> - Export the current results")?;
    writeln!(out, "  :help - List all available commands")?;
    writeln!(out, "  :quit - Exit")?;
    writeln!(out, "\nOr enter a SELECT query directly without any prefix.")?;
    Ok(())
}

/// Runs the shell loop over `input` until `:quit` or end of input.
pub fn run_shell<R: BufRead, W: Write>(shell: &mut MoviesShell, input: R, mut out: W) -> Result<()> {
    write!(out, "{}", shell.render())?;
    write!(out, "> ")?;
    out.flush()?;

    for line in input.lines() {
        let line = line?;
        if !line.trim().is_empty() && shell.execute(parse_command(&line), &mut out)? == ShellFlow::Exit {
            break;
        }
        write!(out, "> ")?;
        out.flush()?;
    }
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::db::Value;
    use crate::movies::DEFAULT_QUERY;

    fn open_shell() -> MoviesShell {
        MoviesShell::open("sqlite::memory:", DEFAULT_QUERY).unwrap()
    }

    #[test]
    fn test_parse_add_command() {
        assert_eq!(
            parse_command(":add Inception | 9 | Dream heist"),
            Command::Add {
                title: "Inception".to_string(),
                rating: "9".to_string(),
                description: "Dream heist".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_add_keeps_pipes_in_description() {
        assert_eq!(
            parse_command(":add Heat | 8 | Cops | robbers"),
            Command::Add {
                title: "Heat".to_string(),
                rating: "8".to_string(),
                description: "Cops | robbers".to_string(),
            }
        );
    }

    #[test]
    fn test_parse_add_with_missing_fields() {
        assert_eq!(
            parse_command(":add Heat"),
            Command::Add {
                title: "Heat".to_string(),
                rating: String::new(),
                description: String::new(),
            }
        );
    }

    #[test]
    fn test_parse_query_forms() {
        assert_eq!(
            parse_command("SELECT * FROM MOVIES"),
            Command::Query(Some("SELECT * FROM MOVIES".to_string()))
        );
        assert_eq!(
            parse_command(":query SELECT name FROM MOVIES"),
            Command::Query(Some("SELECT name FROM MOVIES".to_string()))
        );
        assert_eq!(parse_command(":query"), Command::Query(None));
        assert_eq!(parse_command(":query   "), Command::Query(None));
        assert_eq!(parse_command("  \t "), Command::Query(None));
    }

    #[test]
    fn test_parse_sort_and_others() {
        assert_eq!(
            parse_command(":sort rating desc"),
            Command::Sort {
                column: "rating".to_string(),
                ascending: false
            }
        );
        assert_eq!(
            parse_command(":sort name"),
            Command::Sort {
                column: "name".to_string(),
                ascending: true
            }
        );
        assert_eq!(parse_command(":sort"), Command::Unknown(":sort".to_string()));
        assert_eq!(parse_command(":export csv"), Command::Export("csv".to_string()));
        assert_eq!(parse_command(":quit"), Command::Quit);
        assert_eq!(parse_command(":invalid"), Command::Unknown(":invalid".to_string()));
    }

    #[test]
    fn test_add_movie_refreshes_grid() {
        let mut shell = open_shell();
        assert_eq!(shell.grid().rows.len(), 0);

        shell.add_movie("Inception", "9", "Dream heist").unwrap();
        assert_eq!(shell.grid().rows.len(), 1);
        assert_eq!(
            shell.grid().rows[0].cells[1].value,
            Value::Text("Inception".to_string())
        );
    }

    #[test]
    fn test_add_movie_alerts() {
        let mut shell = open_shell();
        assert_eq!(
            shell.add_movie("Inception", "", "Dream heist").unwrap_err(),
            Alert::new(
                "Invalid Entry!",
                "All fields must be filled out and the rating must be a value from 1 - 10"
            )
        );
        assert_eq!(
            shell.add_movie("Inception", "11", "Dream heist").unwrap_err(),
            Alert::new("Invalid Entry", "Enter a rating from 1 to 10")
        );
        assert_eq!(shell.adapter().row_count().unwrap(), 0);
    }

    #[test]
    fn test_submit_query_resets_buffer_and_keeps_grid_on_failure() {
        let mut shell = open_shell();
        shell.add_movie("Inception", "9", "Dream heist").unwrap();

        shell.submit_query(Some("SELECT name FROM MOVIES")).unwrap();
        assert_eq!(shell.grid().headers.len(), 1);
        assert_eq!(shell.query_text(), DEFAULT_QUERY);

        let alert = shell.submit_query(Some("SELECT * FROM nowhere")).unwrap_err();
        assert_eq!(alert.title, "Database Error");
        assert!(alert.message.contains("no such table"));
        assert_eq!(shell.grid().headers.len(), 1);
        assert_eq!(shell.query_text(), "SELECT * FROM nowhere");

        assert!(shell.submit_query(None).is_err());
        shell.submit_query(Some(DEFAULT_QUERY)).unwrap();
        assert_eq!(shell.grid().headers.len(), 4);
    }

    #[test]
    fn test_run_shell_script() {
        let mut shell = open_shell();
        let script = "\
:add Inception | 9 | Dream heist
:add Alien | 0 | Space horror
SELECT name, rating FROM MOVIES
:bogus
:quit
:show
";
        let mut out = Vec::new();
        run_shell(&mut shell, script.as_bytes(), &mut out).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains("Added movie 'Inception'."));
        assert!(out.contains("Invalid Entry: Enter a rating from 1 to 10"));
        assert!(out.contains("name      | rating"));
        assert!(out.contains("Unknown Command: ':bogus'"));
        // Nothing after :quit runs
        assert_eq!(out.matches("(1 row)").count(), 2);
        shell.close();
    }

    #[test]
    fn test_open_rejects_bad_default_query() {
        match MoviesShell::open("sqlite::memory:", "SELECT * FROM nowhere") {
            Err(MoviesError::Query(msg)) => assert!(msg.contains("no such table")),
            Err(other) => panic!("Expected Query error, got {}", other),
            Ok(_) => panic!("Expected failure"),
        }
    }
}
