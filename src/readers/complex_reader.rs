use crate::error::{IntegrationError, Result};
use crate::models::table::{DataTable, Row};
use crate::services::ensembl_lookup::EnsemblLookup;
use crate::utils::compress::open_input;
use serde_json::json;
use std::path::Path;
use tracing::info;

const HUMAN_ORGANISM: &str = "homo_sapiens";

/// One protein component of an annotated complex.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexComponent {
    pub component_id: String,
    pub complex_id: String,
    pub complex_name: String,
}

/// Reader for the Complex Portal TSV export: explodes complex memberships
/// into per-component rows with the pooled complex names.
pub struct ComplexPortalReader {
    lookup: EnsemblLookup,
}

impl ComplexPortalReader {
    pub fn new(lookup: EnsemblLookup) -> Self {
        Self { lookup }
    }

    pub async fn read(&self, path: &Path) -> Result<DataTable> {
        let components = self.read_components(path)?;
        info!(components = components.len(), "complex components parsed");

        // Pool complex names per component, keeping component order.
        let mut component_ids: Vec<&str> = Vec::new();
        for component in &components {
            if !component_ids.contains(&component.component_id.as_str()) {
                component_ids.push(&component.component_id);
            }
        }

        let mut table = DataTable::with_columns(vec!["id", "COVID_complex_names"]);
        for component_id in component_ids {
            let mut names: Vec<&str> = Vec::new();
            for component in &components {
                if component.component_id == component_id
                    && !names.contains(&component.complex_name.as_str())
                {
                    names.push(&component.complex_name);
                }
            }

            let gene_id = self
                .lookup
                .gene_id(HUMAN_ORGANISM, component_id)
                .await
                .unwrap_or_else(|| component_id.to_string());

            let mut row = Row::new();
            row.insert("id".into(), json!(gene_id));
            row.insert("COVID_complex_names".into(), json!(names));
            table.push_row(row);
        }
        Ok(table)
    }

    /// Explode the `Identifiers (and stoichiometry) of molecules in complex`
    /// column into one row per protein component. Sub-complex members (CPX
    /// accessions) are skipped and isoform suffixes stripped.
    pub fn read_components(&self, path: &Path) -> Result<Vec<ComplexComponent>> {
        let input = open_input(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_reader(input);

        let headers = reader.headers()?.clone();
        let column = |name: &str| -> Result<usize> {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                IntegrationError::InvalidFormat(format!(
                    "complex export is missing the '{}' column",
                    name
                ))
            })
        };
        let complex_idx = column("#Complex ac")?;
        let name_idx = column("Recommended name")?;
        let members_idx = column("Identifiers (and stoichiometry) of molecules in complex")?;

        let mut components = Vec::new();
        for record in reader.records() {
            let record = record?;
            let complex_id = record.get(complex_idx).unwrap_or_default();
            let complex_name = record.get(name_idx).unwrap_or_default();

            for member in record.get(members_idx).unwrap_or_default().split('|') {
                let accession = member.split('(').next().unwrap_or_default();
                if accession.is_empty() || accession.starts_with("CPX") {
                    continue;
                }
                let accession = accession.split('-').next().unwrap_or(accession);

                let component = ComplexComponent {
                    component_id: accession.to_string(),
                    complex_id: complex_id.to_string(),
                    complex_name: complex_name.to_string(),
                };
                if !components.contains(&component) {
                    components.push(component);
                }
            }
        }
        Ok(components)
    }
}
