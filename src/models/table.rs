use serde_json::Value;
use std::collections::HashMap;

/// Join key column shared by the reference table and every parsed dataset.
pub const KEY_COLUMN: &str = "id";

static NULL: Value = Value::Null;

pub type Row = HashMap<String, Value>;

/// In-memory table with an explicit column order.
///
/// Cells are JSON values so that scalar and list-valued attributes can share
/// one representation; list cells are rendered as JSON strings in delimited
/// output and kept as native arrays in line-delimited JSON.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl DataTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_columns<S: Into<String>>(columns: Vec<S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Assemble a table from a prepared column list and row set.
    pub fn from_parts(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Append a column to the layout if it is not declared yet.
    pub fn add_column(&mut self, name: &str) {
        if !self.has_column(name) {
            self.columns.push(name.to_string());
        }
    }

    /// Add a column and set the given value on every existing row.
    pub fn fill_column(&mut self, name: &str, value: Value) {
        self.add_column(name);
        for row in &mut self.rows {
            row.insert(name.to_string(), value.clone());
        }
    }

    pub fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell accessor; undeclared or unset cells read as null.
    pub fn get(&self, row: usize, column: &str) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&NULL)
    }

    /// Canonical string form of a key cell. Null keys never match anything.
    pub fn value_key(value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(cell_to_string(other)),
        }
    }

    /// Row indices grouped by key value, preserving row order within a key.
    pub fn key_index(&self) -> HashMap<String, Vec<usize>> {
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, row) in self.rows.iter().enumerate() {
            if let Some(key) = row.get(KEY_COLUMN).and_then(Self::value_key) {
                index.entry(key).or_default().push(i);
            }
        }
        index
    }

    /// Key values that occur on more than one row, in first-seen order.
    pub fn duplicate_keys(&self) -> Vec<String> {
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut order = Vec::new();
        for row in &self.rows {
            if let Some(key) = row.get(KEY_COLUMN).and_then(Self::value_key) {
                let count = counts.entry(key.clone()).or_insert(0);
                *count += 1;
                if *count == 2 {
                    order.push(key);
                }
            }
        }
        order
    }

    pub fn sort_by_key(&mut self) {
        self.rows.sort_by_key(|row| {
            row.get(KEY_COLUMN)
                .and_then(Self::value_key)
                .unwrap_or_default()
        });
    }
}

/// Render a cell for delimited text and spreadsheet output.
///
/// Nulls become empty fields; list and object cells are serialized as compact
/// JSON so they survive a round trip through text formats.
pub fn cell_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_get_missing_cell_is_null() {
        let mut table = DataTable::with_columns(vec!["id", "score"]);
        table.push_row(row(&[("id", json!("G1"))]));

        assert_eq!(table.get(0, "score"), &Value::Null);
        assert_eq!(table.get(5, "id"), &Value::Null);
    }

    #[test]
    fn test_key_index_groups_duplicates() {
        let mut table = DataTable::with_columns(vec!["id"]);
        table.push_row(row(&[("id", json!("G1"))]));
        table.push_row(row(&[("id", json!("G2"))]));
        table.push_row(row(&[("id", json!("G1"))]));
        table.push_row(row(&[("id", Value::Null)]));

        let index = table.key_index();
        assert_eq!(index.get("G1"), Some(&vec![0, 2]));
        assert_eq!(index.get("G2"), Some(&vec![1]));
        assert_eq!(index.len(), 2);
        assert_eq!(table.duplicate_keys(), vec!["G1".to_string()]);
    }

    #[test]
    fn test_fill_column_sets_every_row() {
        let mut table = DataTable::with_columns(vec!["id"]);
        table.push_row(row(&[("id", json!("G1"))]));
        table.push_row(row(&[("id", json!("G2"))]));

        table.fill_column("present", Value::Bool(true));

        assert!(table.has_column("present"));
        assert_eq!(table.get(0, "present"), &Value::Bool(true));
        assert_eq!(table.get(1, "present"), &Value::Bool(true));
    }

    #[test]
    fn test_sort_by_key() {
        let mut table = DataTable::with_columns(vec!["id"]);
        table.push_row(row(&[("id", json!("G3"))]));
        table.push_row(row(&[("id", json!("G1"))]));
        table.push_row(row(&[("id", json!("G2"))]));

        table.sort_by_key();

        assert_eq!(table.get(0, "id"), &json!("G1"));
        assert_eq!(table.get(2, "id"), &json!("G3"));
    }

    #[test]
    fn test_cell_to_string() {
        assert_eq!(cell_to_string(&Value::Null), "");
        assert_eq!(cell_to_string(&json!(true)), "true");
        assert_eq!(cell_to_string(&json!(4)), "4");
        assert_eq!(cell_to_string(&json!("ENSG1")), "ENSG1");
        assert_eq!(cell_to_string(&json!(["a", "b"])), r#"["a","b"]"#);
    }
}
