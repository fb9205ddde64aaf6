use crate::error::Result;
use crate::models::table::{DataTable, Row};
use crate::utils::compress::open_input;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Builds the UniProt accession to Ensembl gene id map from the two sources
/// that carry mappings: the UniProt id-mapping export and the map derived
/// from the parsed Ensembl genes.
pub struct IdMapReader;

impl IdMapReader {
    pub fn new() -> Self {
        Self
    }

    /// Read the UniProt id-mapping export: headerless three-column TSV of
    /// (accession, source database, foreign id), restricted to the Ensembl
    /// source.
    pub fn read_uniprot_map(&self, path: &Path) -> Result<Vec<(String, String)>> {
        let input = open_input(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_reader(input);

        let mut pairs = Vec::new();
        for record in reader.records() {
            let record = record?;
            let (Some(uniprot), Some(source), Some(id)) =
                (record.get(0), record.get(1), record.get(2))
            else {
                continue;
            };
            if source == "Ensembl" {
                pairs.push((uniprot.to_string(), id.to_string()));
            }
        }
        Ok(pairs)
    }

    /// Read the Ensembl-derived map: headered TSV with `uniprot_id` and
    /// `ensembl_id` columns.
    pub fn read_ensembl_map(&self, path: &Path) -> Result<Vec<(String, String)>> {
        let input = open_input(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .from_reader(input);

        let headers = reader.headers()?.clone();
        let uniprot_idx = headers.iter().position(|h| h == "uniprot_id");
        let ensembl_idx = headers.iter().position(|h| h == "ensembl_id");
        let (Some(uniprot_idx), Some(ensembl_idx)) = (uniprot_idx, ensembl_idx) else {
            return Err(crate::error::IntegrationError::InvalidFormat(
                "Ensembl map needs uniprot_id and ensembl_id columns".to_string(),
            ));
        };

        let mut pairs = Vec::new();
        for record in reader.records() {
            let record = record?;
            if let (Some(uniprot), Some(ensembl)) =
                (record.get(uniprot_idx), record.get(ensembl_idx))
            {
                pairs.push((uniprot.to_string(), ensembl.to_string()));
            }
        }
        Ok(pairs)
    }

    /// Concatenate both sources and drop duplicate mappings, keeping first
    /// occurrence order.
    pub fn build(&self, uniprot_map: &Path, ensembl_map: &Path) -> Result<DataTable> {
        let uniprot_pairs = self.read_uniprot_map(uniprot_map)?;
        let ensembl_pairs = self.read_ensembl_map(ensembl_map)?;
        info!(
            uniprot = uniprot_pairs.len(),
            ensembl = ensembl_pairs.len(),
            "merging identifier maps"
        );

        let mut seen = std::collections::HashSet::new();
        let mut table = DataTable::with_columns(vec!["uniprot_id", "ensembl_id"]);
        for (uniprot, ensembl) in uniprot_pairs.into_iter().chain(ensembl_pairs) {
            if seen.insert((uniprot.clone(), ensembl.clone())) {
                let mut row = Row::new();
                row.insert("uniprot_id".into(), json!(uniprot));
                row.insert("ensembl_id".into(), json!(ensembl));
                table.push_row(row);
            }
        }
        info!(mappings = table.len(), "identifier map built");
        Ok(table)
    }

    /// Accession to gene ids lookup for readers that remap interactors.
    pub fn as_multimap(pairs: &[(String, String)]) -> HashMap<String, Vec<String>> {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (uniprot, ensembl) in pairs {
            let genes = map.entry(uniprot.clone()).or_default();
            if !genes.contains(ensembl) {
                genes.push(ensembl.clone());
            }
        }
        map
    }
}

impl Default for IdMapReader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_build_merges_and_deduplicates() -> Result<()> {
        let dir = TempDir::new()?;
        let uniprot_path = dir.path().join("uniprot_map.tsv");
        let ensembl_path = dir.path().join("ensembl_map.tsv");

        let mut file = std::fs::File::create(&uniprot_path)?;
        writeln!(file, "Q9BYF1\tEnsembl\tENSG00000130234")?;
        writeln!(file, "Q9BYF1\tRefSeq\tNM_021804")?;
        writeln!(file, "O15393\tEnsembl\tENSG00000184012")?;

        let mut file = std::fs::File::create(&ensembl_path)?;
        writeln!(file, "uniprot_id\tensembl_id")?;
        writeln!(file, "Q9BYF1\tENSG00000130234")?;
        writeln!(file, "P09958\tENSG00000140564")?;

        let table = IdMapReader::new().build(&uniprot_path, &ensembl_path)?;

        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0, "uniprot_id"), &serde_json::json!("Q9BYF1"));
        assert_eq!(table.get(2, "uniprot_id"), &serde_json::json!("P09958"));
        Ok(())
    }

    #[test]
    fn test_as_multimap() {
        let pairs = vec![
            ("Q9BYF1".to_string(), "ENSG1".to_string()),
            ("Q9BYF1".to_string(), "ENSG2".to_string()),
            ("Q9BYF1".to_string(), "ENSG1".to_string()),
        ];
        let map = IdMapReader::as_multimap(&pairs);
        assert_eq!(map["Q9BYF1"], vec!["ENSG1", "ENSG2"]);
    }
}
