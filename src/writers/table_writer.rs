use crate::error::{IntegrationError, Result};
use crate::models::table::{cell_to_string, DataTable};
use crate::utils::compress::create_output;
use rust_xlsxwriter::Workbook;
use serde_json::{Map, Value};
use std::path::Path;

/// Output format, selected from the path suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Tab-separated text (`.tsv`, `.txt`, `.tab`)
    Tsv,
    /// Spreadsheet workbook (`.xlsx`)
    Xlsx,
    /// Line-delimited JSON (`.json`, `.jsonl`, `.ndjson`)
    Ndjson,
}

pub struct TableWriter;

impl TableWriter {
    pub fn new() -> Self {
        Self
    }

    /// Detect the output format and compression from the path suffix.
    /// A trailing `.gz` gzip-compresses the text formats.
    pub fn detect_format(path: &Path) -> Result<(OutputFormat, bool)> {
        let name = path
            .file_name()
            .and_then(|f| f.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let (name, gzip) = match name.strip_suffix(".gz") {
            Some(stem) => (stem.to_string(), true),
            None => (name, false),
        };

        let format = match name.rsplit('.').next() {
            Some("tsv") | Some("txt") | Some("tab") => OutputFormat::Tsv,
            Some("xlsx") => OutputFormat::Xlsx,
            Some("json") | Some("jsonl") | Some("ndjson") => OutputFormat::Ndjson,
            _ => {
                return Err(IntegrationError::Config(format!(
                    "Unsupported output format: {}",
                    path.display()
                )))
            }
        };

        if format == OutputFormat::Xlsx && gzip {
            return Err(IntegrationError::Config(
                "Spreadsheet output cannot be gzip-compressed".to_string(),
            ));
        }

        Ok((format, gzip))
    }

    pub fn write(&self, table: &DataTable, path: &Path) -> Result<()> {
        let (format, gzip) = Self::detect_format(path)?;
        match format {
            OutputFormat::Tsv => self.write_tsv(table, path, gzip),
            OutputFormat::Xlsx => self.write_xlsx(table, path),
            OutputFormat::Ndjson => self.write_ndjson(table, path, gzip),
        }
    }

    fn write_tsv(&self, table: &DataTable, path: &Path, gzip: bool) -> Result<()> {
        let output = create_output(path, gzip)?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(output);

        writer.write_record(table.columns())?;
        for i in 0..table.len() {
            let record: Vec<String> = table
                .columns()
                .iter()
                .map(|column| cell_to_string(table.get(i, column)))
                .collect();
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_ndjson(&self, table: &DataTable, path: &Path, gzip: bool) -> Result<()> {
        use std::io::Write;

        let mut output = create_output(path, gzip)?;
        for i in 0..table.len() {
            let mut object = Map::new();
            for column in table.columns() {
                object.insert(column.clone(), table.get(i, column).clone());
            }
            serde_json::to_writer(&mut output, &Value::Object(object))?;
            writeln!(output)?;
        }
        output.flush()?;
        Ok(())
    }

    fn write_xlsx(&self, table: &DataTable, path: &Path) -> Result<()> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();

        for (col, column) in table.columns().iter().enumerate() {
            worksheet.write_string(0, col as u16, column.as_str())?;
        }
        for i in 0..table.len() {
            let row = (i + 1) as u32;
            for (col, column) in table.columns().iter().enumerate() {
                let col = col as u16;
                match table.get(i, column) {
                    Value::Null => {}
                    Value::Bool(b) => {
                        worksheet.write_boolean(row, col, *b)?;
                    }
                    Value::Number(n) => {
                        if let Some(v) = n.as_f64() {
                            worksheet.write_number(row, col, v)?;
                        }
                    }
                    other => {
                        worksheet.write_string(row, col, cell_to_string(other).as_str())?;
                    }
                }
            }
        }

        workbook.save(path)?;
        Ok(())
    }
}

impl Default for TableWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Read;
    use tempfile::TempDir;

    fn sample_table() -> DataTable {
        let mut table = DataTable::with_columns(vec!["id", "score", "tissues"]);
        let mut row = crate::models::table::Row::new();
        row.insert("id".into(), json!("G1"));
        row.insert("score".into(), json!(5));
        row.insert("tissues".into(), json!(["lung", "kidney"]));
        table.push_row(row);
        let mut row = crate::models::table::Row::new();
        row.insert("id".into(), json!("G2"));
        table.push_row(row);
        table
    }

    #[test]
    fn test_detect_format() {
        let ok = |name: &str| TableWriter::detect_format(Path::new(name)).unwrap();

        assert_eq!(ok("out.tsv"), (OutputFormat::Tsv, false));
        assert_eq!(ok("out.txt.gz"), (OutputFormat::Tsv, true));
        assert_eq!(ok("out.xlsx"), (OutputFormat::Xlsx, false));
        assert_eq!(ok("out.json.gz"), (OutputFormat::Ndjson, true));
        assert_eq!(ok("out.JSONL"), (OutputFormat::Ndjson, false));

        assert!(TableWriter::detect_format(Path::new("out.parquet")).is_err());
        assert!(TableWriter::detect_format(Path::new("out.xlsx.gz")).is_err());
    }

    #[test]
    fn test_write_tsv() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("out.tsv");

        TableWriter::new().write(&sample_table(), &path)?;

        let content = std::fs::read_to_string(&path)?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "id\tscore\ttissues");
        assert_eq!(lines[1], "G1\t5\t\"[\"\"lung\"\",\"\"kidney\"\"]\"");
        assert_eq!(lines[2], "G2\t\t");
        Ok(())
    }

    #[test]
    fn test_write_ndjson_gzip() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("out.json.gz");

        TableWriter::new().write(&sample_table(), &path)?;

        let mut reader = crate::utils::compress::open_input(&path)?;
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: Value = serde_json::from_str(lines[0])?;
        assert_eq!(first["id"], json!("G1"));
        assert_eq!(first["tissues"], json!(["lung", "kidney"]));
        let second: Value = serde_json::from_str(lines[1])?;
        assert_eq!(second["score"], Value::Null);
        Ok(())
    }

    #[test]
    fn test_write_xlsx() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("out.xlsx");

        TableWriter::new().write(&sample_table(), &path)?;

        let metadata = std::fs::metadata(&path)?;
        assert!(metadata.len() > 0);
        Ok(())
    }
}
