use crate::error::Result;
use crate::models::table::{DataTable, Row};
use crate::utils::compress::open_input;
use serde_json::Value;
use std::io::BufRead;
use std::path::Path;

/// Reader for the Human Protein Atlas export (one JSON object per line):
/// subcellular location and RNA tissue expression summary per gene.
pub struct HpaReader;

impl HpaReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read(&self, path: &Path) -> Result<DataTable> {
        let input = open_input(path)?;
        let mut table = DataTable::with_columns(vec![
            "id",
            "hpa_subcellular_location",
            "hpa_rna_tissue_distribution",
            "hpa_rna_tissue_specificity",
            "hpa_rna_specific_tissues",
        ]);

        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: Value = serde_json::from_str(&line)?;

            // Tissues with elevated expression come as an object keyed by
            // tissue name; only the names are carried.
            let specific_tissues = entry
                .get("RNA tissue specific NX")
                .and_then(Value::as_object)
                .map(|tissues| Value::from(tissues.keys().cloned().collect::<Vec<_>>()))
                .unwrap_or(Value::Null);

            let field = |name: &str| entry.get(name).cloned().unwrap_or(Value::Null);

            let mut row = Row::new();
            row.insert("id".into(), field("Ensembl"));
            row.insert("hpa_subcellular_location".into(), field("Subcellular location"));
            row.insert(
                "hpa_rna_tissue_distribution".into(),
                field("RNA tissue distribution"),
            );
            row.insert(
                "hpa_rna_tissue_specificity".into(),
                field("RNA tissue specificity"),
            );
            row.insert("hpa_rna_specific_tissues".into(), specific_tissues);
            table.push_row(row);
        }
        Ok(table)
    }
}

impl Default for HpaReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_read() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("hpa.json");
        let mut file = std::fs::File::create(&path)?;
        writeln!(
            file,
            r#"{{"Ensembl":"ENSG00000130234","Subcellular location":["Golgi apparatus"],"RNA tissue distribution":"Detected in some","RNA tissue specificity":"Tissue enhanced","RNA tissue specific NX":{{"intestine":12.1,"kidney":56.1}}}}"#
        )?;
        writeln!(
            file,
            r#"{{"Ensembl":"ENSG00000184012","Subcellular location":null,"RNA tissue distribution":"Detected in all","RNA tissue specificity":"Low tissue specificity","RNA tissue specific NX":null}}"#
        )?;

        let table = HpaReader::new().read(&path)?;

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "id"), &json!("ENSG00000130234"));
        assert_eq!(
            table.get(0, "hpa_rna_specific_tissues"),
            &json!(["intestine", "kidney"])
        );
        assert_eq!(table.get(1, "hpa_rna_specific_tissues"), &Value::Null);
        assert_eq!(table.get(1, "hpa_subcellular_location"), &Value::Null);
        Ok(())
    }
}
