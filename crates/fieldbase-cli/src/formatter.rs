//! Output formatters for command results.

use clap::ValueEnum;
use comfy_table::{Cell, Table};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
    /// CSV format
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

/// A titled block of string cells.
#[derive(Debug, Clone, Default)]
pub struct Rows {
    /// Column headers.
    pub headers: Vec<String>,
    /// Row cells, one per header.
    pub rows: Vec<Vec<String>>,
}

impl Rows {
    /// Create an empty block with the given headers.
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row.
    pub fn push<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Trait for formatting output.
pub trait Formatter {
    /// Format a block of rows.
    fn format_rows(&self, rows: &Rows) -> String;

    /// Format a simple message.
    fn format_message(&self, message: &str) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Csv => Box::new(CsvFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_rows(&self, rows: &Rows) -> String {
        if rows.is_empty() {
            return "No results".to_string();
        }

        let mut table = Table::new();
        table.set_header(rows.headers.iter().map(Cell::new).collect::<Vec<_>>());
        for row in &rows.rows {
            table.add_row(row.iter().map(Cell::new).collect::<Vec<_>>());
        }
        format!("{}\n{} row(s)", table, rows.len())
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_rows(&self, rows: &Rows) -> String {
        let array: Vec<serde_json::Value> = rows
            .rows
            .iter()
            .map(|row| {
                let obj: serde_json::Map<String, serde_json::Value> = rows
                    .headers
                    .iter()
                    .zip(row)
                    .map(|(h, cell)| (h.clone(), serde_json::Value::String(cell.clone())))
                    .collect();
                serde_json::Value::Object(obj)
            })
            .collect();
        serde_json::to_string_pretty(&array).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({ "message": message }).to_string()
    }
}

/// CSV formatter.
pub struct CsvFormatter;

impl Formatter for CsvFormatter {
    fn format_rows(&self, rows: &Rows) -> String {
        let mut output = rows.headers.join(",");
        output.push('\n');
        for row in &rows.rows {
            let cells: Vec<String> = row.iter().map(|c| format_cell_csv(c)).collect();
            output.push_str(&cells.join(","));
            output.push('\n');
        }
        output
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }
}

/// Quote a cell when it contains a separator, quote or newline.
fn format_cell_csv(cell: &str) -> String {
    if cell.contains([',', '"', '\n']) {
        format!("\"{}\"", escape_csv(cell))
    } else {
        cell.to_string()
    }
}

/// Escape a string for CSV.
fn escape_csv(s: &str) -> String {
    s.replace('"', "\"\"")
}
