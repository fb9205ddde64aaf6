use crate::error::{IntegrationError, Result};
use crate::models::table::{DataTable, Row};
use crate::utils::compress::open_input;
use serde_json::{json, Value};
use std::path::Path;

/// Top-bucket descriptions per assessment modality, derived from the target
/// tractability documentation.
struct Bucket {
    sm: Option<&'static str>,
    ab: Option<&'static str>,
    other: Option<&'static str>,
}

const BUCKETS: [Bucket; 9] = [
    Bucket {
        sm: Some("Targets with drugs in phase IV"),
        ab: Some("Targets with drugs in phase IV"),
        other: Some("Targets with drugs in phase IV"),
    },
    Bucket {
        sm: Some("Targets with drugs in phase II or phase III"),
        ab: Some("Targets with drugs in phase II or phase III"),
        other: Some("Targets with drugs in phase II or phase III"),
    },
    Bucket {
        sm: Some("Targets with drugs in phase 0 or phase I"),
        ab: Some("Targets with drugs in phase 0 or phase I"),
        other: Some("Targets with drugs in phase 0 or phase I"),
    },
    Bucket {
        sm: Some("Targets with crystal structures with ligands"),
        ab: Some("Targets located in the plasma membrane"),
        other: None,
    },
    Bucket {
        sm: Some("Targets with a drugEBIlity score equal or greater than 0.7"),
        ab: Some("Targets with GO cell component terms plasma membrane or secreted"),
        other: None,
    },
    Bucket {
        sm: Some("Targets with drugEBIlity between zero and 0.7"),
        ab: Some(
            "Targets with GO cell component terms plasma membrane or secreted with low or unknown confidence",
        ),
        other: None,
    },
    Bucket {
        sm: Some("Targets with ligands"),
        ab: Some("Targets with predicted signal peptide and transmembrane domains"),
        other: None,
    },
    Bucket {
        sm: Some("Targets with a predicted Ro5 druggable domain (druggable genome)"),
        ab: Some("GO cell component - medium confidence"),
        other: None,
    },
    Bucket {
        sm: None,
        ab: Some("Human Protein Atlas - high confidence"),
        other: None,
    },
];

/// Reader for the tractability bucket TSV: translates the per-modality top
/// bucket numbers into their descriptions.
pub struct TractabilityReader;

impl TractabilityReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read(&self, path: &Path) -> Result<DataTable> {
        let input = open_input(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_reader(input);

        let headers = reader.headers()?.clone();
        let column = |name: &str| -> Result<usize> {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                IntegrationError::InvalidFormat(format!(
                    "tractability export is missing the '{}' column",
                    name
                ))
            })
        };
        let gene_idx = column("ensembl_gene_id")?;
        let sm_idx = column("Top_bucket_sm")?;
        let ab_idx = column("Top_bucket_ab")?;
        let other_idx = column("Top_bucket_othercl")?;

        let mut table = DataTable::with_columns(vec![
            "id",
            "Tractability_Top_bucket_(sm)",
            "Tractability_Top_bucket_(ab)",
            "Tractability_Top_bucket_(other)",
        ]);

        for record in reader.records() {
            let record = record?;
            let describe = |idx: usize, pick: fn(&Bucket) -> Option<&'static str>| -> Value {
                parse_bucket(record.get(idx).unwrap_or_default())
                    .and_then(|bucket| BUCKETS.get(bucket - 1))
                    .and_then(pick)
                    .map(Value::from)
                    .unwrap_or(Value::Null)
            };

            let mut row = Row::new();
            row.insert("id".into(), json!(record.get(gene_idx).unwrap_or_default()));
            row.insert(
                "Tractability_Top_bucket_(sm)".into(),
                describe(sm_idx, |b| b.sm),
            );
            row.insert(
                "Tractability_Top_bucket_(ab)".into(),
                describe(ab_idx, |b| b.ab),
            );
            row.insert(
                "Tractability_Top_bucket_(other)".into(),
                describe(other_idx, |b| b.other),
            );
            table.push_row(row);
        }
        Ok(table)
    }
}

impl Default for TractabilityReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Bucket numbers arrive as integers or floats ("4" or "4.0").
fn parse_bucket(field: &str) -> Option<usize> {
    if field.is_empty() {
        return None;
    }
    let bucket = field.parse::<f64>().ok()?;
    let bucket = bucket as usize;
    (1..=BUCKETS.len()).contains(&bucket).then_some(bucket)
}
