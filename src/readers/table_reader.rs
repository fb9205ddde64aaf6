use crate::error::{IntegrationError, Result};
use crate::models::table::{DataTable, Row};
use crate::utils::compress::open_input;
use serde_json::{Map, Value};
use std::io::BufRead;
use std::path::Path;

/// Loader for parsed datasets: tab-separated text or line-delimited JSON,
/// transparently gunzipped. Cells read from text are typed (null, boolean,
/// number, JSON list) so that downstream merges see the same values the
/// parser wrote.
pub struct TableReader;

impl TableReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read(&self, path: &Path) -> Result<DataTable> {
        let name = path
            .file_name()
            .and_then(|f| f.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        let stem = name.strip_suffix(".gz").unwrap_or(&name);

        match stem.rsplit('.').next() {
            Some("tsv") | Some("txt") | Some("tab") => self.read_tsv(path),
            Some("json") | Some("jsonl") | Some("ndjson") => self.read_ndjson(path),
            _ => Err(IntegrationError::InvalidFormat(format!(
                "Unsupported table format: {}",
                path.display()
            ))),
        }
    }

    fn read_tsv(&self, path: &Path) -> Result<DataTable> {
        let input = open_input(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_reader(input);

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(str::to_string)
            .collect();

        let mut table = DataTable::with_columns(columns.clone());
        for record in reader.records() {
            let record = record?;
            let mut row = Row::new();
            for (column, field) in columns.iter().zip(record.iter()) {
                row.insert(column.clone(), parse_cell(field));
            }
            table.push_row(row);
        }
        Ok(table)
    }

    fn read_ndjson(&self, path: &Path) -> Result<DataTable> {
        let input = open_input(path)?;
        let mut table = DataTable::new();
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let object: Map<String, Value> = serde_json::from_str(&line)?;
            let mut row = Row::new();
            for (key, value) in object {
                table.add_column(&key);
                row.insert(key, value);
            }
            table.push_row(row);
        }
        Ok(table)
    }
}

impl Default for TableReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Type a text cell: empty fields are null, `true`/`false` boolean, numeric
/// forms numbers, bracketed JSON kept structured, everything else a string.
fn parse_cell(field: &str) -> Value {
    if field.is_empty() {
        return Value::Null;
    }
    match field {
        "true" | "True" => return Value::Bool(true),
        "false" | "False" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(i) = field.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = field.parse::<f64>() {
        if f.is_finite() {
            if let Some(number) = serde_json::Number::from_f64(f) {
                return Value::Number(number);
            }
        }
    }
    if field.starts_with('[') || field.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<Value>(field) {
            return value;
        }
    }
    Value::String(field.to_string())
}
