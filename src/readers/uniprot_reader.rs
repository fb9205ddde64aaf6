use crate::error::{IntegrationError, Result};
use crate::models::table::{DataTable, Row};
use crate::services::ensembl_lookup::{normalize_organism, EnsemblLookup};
use crate::utils::progress::ProgressReporter;
use serde_json::{json, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// Reader for the UniProtKB REST JSON export (`results` array of entries).
pub struct UniprotReader {
    lookup: EnsemblLookup,
}

impl UniprotReader {
    pub fn new(lookup: EnsemblLookup) -> Self {
        Self { lookup }
    }

    /// Parse the export and resolve each primary accession to an Ensembl gene
    /// id through the cross-reference service. Unresolvable accessions leave
    /// `gene_id` null.
    pub async fn read(&self, path: &Path) -> Result<DataTable> {
        let file = BufReader::new(File::open(path)?);
        let data: Value = serde_json::from_reader(file)?;
        let mut table = self.parse_entries(&data)?;

        info!(entries = table.len(), "mapping primary UniProt accessions to Ensembl gene ids");
        let progress =
            ProgressReporter::new(table.len() as u64, "Mapping accessions...", false);

        table.add_column("gene_id");
        let mut gene_ids = Vec::with_capacity(table.len());
        for i in 0..table.len() {
            let accession = table.get(i, "primaryAccession").as_str().unwrap_or_default();
            let organism = table
                .get(i, "organism_scientific_name")
                .as_str()
                .map(normalize_organism)
                .unwrap_or_default();
            let gene_id = self.lookup.gene_id(&organism, accession).await;
            gene_ids.push(gene_id.map(Value::String).unwrap_or(Value::Null));
            progress.increment(1);
        }
        progress.finish_with_message("Accession mapping complete");

        let mut mapped = DataTable::with_columns(table.columns().to_vec());
        for (i, gene_id) in gene_ids.into_iter().enumerate() {
            let mut row: Row = table.rows()[i].clone();
            row.insert("gene_id".to_string(), gene_id);
            mapped.push_row(row);
        }
        Ok(mapped)
    }

    /// Extract the tabular fields from the export, without network lookups.
    pub fn parse_entries(&self, data: &Value) -> Result<DataTable> {
        let results = data
            .get("results")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                IntegrationError::InvalidFormat(
                    "UniProt export has no 'results' array".to_string(),
                )
            })?;

        let mut table = DataTable::with_columns(vec![
            "primaryAccession",
            "uniprot_name",
            "organism_name",
            "organism_id",
            "organism_scientific_name",
            "secondaryAccessions",
        ]);

        for entry in results {
            let accession = entry
                .get("primaryAccession")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    IntegrationError::MissingData(
                        "UniProt entry without a primaryAccession".to_string(),
                    )
                })?;
            let organism = entry.get("organism").cloned().unwrap_or(Value::Null);

            let secondary = entry
                .get("secondaryAccessions")
                .and_then(Value::as_array)
                .map(|accessions| {
                    accessions
                        .iter()
                        .filter_map(Value::as_str)
                        .collect::<Vec<_>>()
                        .join(",")
                })
                .map(Value::from)
                .unwrap_or(Value::Null);

            let mut row = Row::new();
            row.insert("primaryAccession".into(), json!(accession));
            row.insert(
                "uniprot_name".into(),
                entry.get("uniProtkbId").cloned().unwrap_or(Value::Null),
            );
            row.insert(
                "organism_name".into(),
                organism.get("commonName").cloned().unwrap_or(Value::Null),
            );
            row.insert(
                "organism_id".into(),
                organism.get("taxonId").cloned().unwrap_or(Value::Null),
            );
            row.insert(
                "organism_scientific_name".into(),
                organism
                    .get("scientificName")
                    .cloned()
                    .unwrap_or(Value::Null),
            );
            row.insert("secondaryAccessions".into(), secondary);
            table.push_row(row);
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn export() -> Value {
        json!({
            "results": [
                {
                    "primaryAccession": "P0DTC2",
                    "uniProtkbId": "SPIKE_SARS2",
                    "organism": {
                        "commonName": "2019-nCoV",
                        "taxonId": 2697049,
                        "scientificName": "Severe acute respiratory syndrome coronavirus 2"
                    },
                    "secondaryAccessions": ["A0A679G9E9", "A0A6B9WHD3"]
                },
                {
                    "primaryAccession": "Q9BYF1",
                    "uniProtkbId": "ACE2_HUMAN",
                    "organism": {
                        "taxonId": 9606,
                        "scientificName": "Homo sapiens"
                    }
                }
            ]
        })
    }

    #[test]
    fn test_parse_entries() {
        let reader = UniprotReader::new(EnsemblLookup::new());
        let table = reader.parse_entries(&export()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "primaryAccession"), &json!("P0DTC2"));
        assert_eq!(
            table.get(0, "secondaryAccessions"),
            &json!("A0A679G9E9,A0A6B9WHD3")
        );
        assert_eq!(table.get(1, "organism_name"), &Value::Null);
        assert_eq!(table.get(1, "organism_id"), &json!(9606));
    }

    #[test]
    fn test_missing_results_is_invalid() {
        let reader = UniprotReader::new(EnsemblLookup::new());
        let err = reader.parse_entries(&json!({})).unwrap_err();
        assert!(matches!(err, IntegrationError::InvalidFormat(_)));
    }
}
