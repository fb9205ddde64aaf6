use crate::error::Result;
use crate::models::drug::DrugEvidenceRecord;
use crate::models::table::{DataTable, Row};
use crate::utils::compress::open_input;
use serde_json::json;
use std::path::Path;
use validator::Validate;

/// Reader for the drug evidence export and its per-entity aggregations.
///
/// The export is a headerless TSV of (target id, disease id, drug id,
/// clinical phase, mechanism of action, drug name) rows.
pub struct DrugEvidenceReader;

impl DrugEvidenceReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read_records(&self, path: &Path) -> Result<Vec<DrugEvidenceRecord>> {
        let input = open_input(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_reader(input);

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record?;
            let field = |i: usize| record.get(i).unwrap_or_default();
            let optional = |i: usize| {
                record
                    .get(i)
                    .filter(|value| !value.is_empty())
                    .map(String::from)
            };

            let evidence = DrugEvidenceRecord {
                id: field(0).to_string(),
                disease_id: optional(1),
                drug_id: field(2).to_string(),
                phase: field(3).parse::<i64>().map_err(|_| {
                    crate::error::IntegrationError::InvalidFormat(format!(
                        "invalid clinical phase: '{}'",
                        field(3)
                    ))
                })?,
                moa: optional(4),
                drug_name: optional(5),
            };
            evidence.validate()?;
            records.push(evidence);
        }
        Ok(records)
    }

    /// Per-target aggregation: highest clinical phase reached and number of
    /// distinct drugs in the clinic. Rows are sorted by target id.
    pub fn target_summary(&self, records: &[DrugEvidenceRecord]) -> DataTable {
        let mut targets: Vec<&str> = Vec::new();
        for record in records {
            if !targets.contains(&record.id.as_str()) {
                targets.push(&record.id);
            }
        }
        targets.sort_unstable();

        let mut table =
            DataTable::with_columns(vec!["id", "max_phase", "drugs_in_clinic"]);
        for target in targets {
            let mut max_phase = i64::MIN;
            let mut drugs: Vec<&str> = Vec::new();
            for record in records.iter().filter(|r| r.id == target) {
                max_phase = max_phase.max(record.phase);
                if !drugs.contains(&record.drug_id.as_str()) {
                    drugs.push(&record.drug_id);
                }
            }

            let mut row = Row::new();
            row.insert("id".into(), json!(target));
            row.insert("max_phase".into(), json!(max_phase));
            row.insert("drugs_in_clinic".into(), json!(drugs.len()));
            table.push_row(row);
        }
        table
    }

    /// Per-drug aggregation: highest clinical phase across every target and
    /// disease. Rows are sorted by drug id.
    pub fn drug_summary(&self, records: &[DrugEvidenceRecord]) -> DataTable {
        let mut drugs: Vec<&str> = Vec::new();
        for record in records {
            if !drugs.contains(&record.drug_id.as_str()) {
                drugs.push(&record.drug_id);
            }
        }
        drugs.sort_unstable();

        let mut table = DataTable::with_columns(vec!["id", "max_phase"]);
        for drug in drugs {
            let max_phase = records
                .iter()
                .filter(|r| r.drug_id == drug)
                .map(|r| r.phase)
                .max()
                .unwrap_or_default();

            let mut row = Row::new();
            row.insert("id".into(), json!(drug));
            row.insert("max_phase".into(), json!(max_phase));
            table.push_row(row);
        }
        table
    }
}

impl Default for DrugEvidenceReader {
    fn default() -> Self {
        Self::new()
    }
}
