use crate::error::{IntegrationError, Result};
use crate::models::table::{DataTable, Row};
use crate::utils::compress::open_input;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Taxa kept when filtering the interaction network: SARS-CoV-2, SARS-CoV
/// and human.
const KEPT_TAXA: [&str; 3] = ["2697049", "694009", "9606"];
const HUMAN_TAXON: &str = "9606";

/// Reader for the molecular interaction network TSV export. Produces one row
/// per interactor with the pooled identifiers of its direct viral
/// interactions, remapped to Ensembl gene ids where the identifier map knows
/// the accession.
pub struct IntactReader;

#[derive(Debug, Clone, PartialEq)]
struct Interaction {
    interaction_id: String,
    id_a: String,
    id_b: String,
}

impl IntactReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read(
        &self,
        network_path: &Path,
        id_map: &HashMap<String, Vec<String>>,
    ) -> Result<DataTable> {
        let interactions = self.read_interactions(network_path)?;
        info!(
            interactions = interactions.len(),
            "host-pathogen interactions kept after taxon filtering"
        );
        Ok(Self::aggregate(&interactions, id_map))
    }

    /// Parse, filter and deduplicate the network export.
    fn read_interactions(&self, path: &Path) -> Result<Vec<Interaction>> {
        let input = open_input(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_reader(input);

        let headers = reader.headers()?.clone();
        let column = |name: &str| -> Result<usize> {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                IntegrationError::InvalidFormat(format!(
                    "interaction export is missing the '{}' column",
                    name
                ))
            })
        };
        let id_a_idx = column("#ID(s) interactor A")?;
        let id_b_idx = column("ID(s) interactor B")?;
        let taxid_a_idx = column("Taxid interactor A")?;
        let taxid_b_idx = column("Taxid interactor B")?;
        let interaction_idx = column("Interaction identifier(s)")?;

        let mut interactions = Vec::new();
        for record in reader.records() {
            let record = record?;
            let taxid_a = parse_taxid(record.get(taxid_a_idx).unwrap_or_default());
            let taxid_b = parse_taxid(record.get(taxid_b_idx).unwrap_or_default());
            let (Some(taxid_a), Some(taxid_b)) = (taxid_a, taxid_b) else {
                continue;
            };

            // Keep host-pathogen pairs only: both taxa recognized, homolog
            // organisms excluded, human-human interactions dropped.
            if !KEPT_TAXA.contains(&taxid_a.as_str()) || !KEPT_TAXA.contains(&taxid_b.as_str()) {
                continue;
            }
            if taxid_a == HUMAN_TAXON && taxid_b == HUMAN_TAXON {
                continue;
            }

            let interaction = Interaction {
                interaction_id: parse_interaction_id(
                    record.get(interaction_idx).unwrap_or_default(),
                ),
                id_a: parse_interactor_id(record.get(id_a_idx).unwrap_or_default()),
                id_b: parse_interactor_id(record.get(id_b_idx).unwrap_or_default()),
            };
            if !interactions.contains(&interaction) {
                interactions.push(interaction);
            }
        }
        Ok(interactions)
    }

    /// Pool interaction identifiers per interactor and remap accessions to
    /// Ensembl gene ids, falling back to the accession itself.
    fn aggregate(
        interactions: &[Interaction],
        id_map: &HashMap<String, Vec<String>>,
    ) -> DataTable {
        let mut interactors: Vec<&str> = Vec::new();
        for interaction in interactions {
            for id in [interaction.id_a.as_str(), interaction.id_b.as_str()] {
                if !interactors.contains(&id) {
                    interactors.push(id);
                }
            }
        }

        let mut table = DataTable::with_columns(vec!["id", "Covid_direct_interactions"]);
        for interactor in interactors {
            let mut interaction_ids: Vec<&str> = Vec::new();
            for interaction in interactions {
                if (interaction.id_a == interactor || interaction.id_b == interactor)
                    && !interaction_ids.contains(&interaction.interaction_id.as_str())
                {
                    interaction_ids.push(&interaction.interaction_id);
                }
            }

            let interactions_value = json!(interaction_ids);
            let gene_ids = id_map
                .get(interactor)
                .cloned()
                .unwrap_or_else(|| vec![interactor.to_string()]);
            for gene_id in gene_ids {
                let mut row = Row::new();
                row.insert("id".into(), json!(gene_id));
                row.insert(
                    "Covid_direct_interactions".into(),
                    interactions_value.clone(),
                );
                table.push_row(row);
            }
        }
        table
    }
}

impl Default for IntactReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Taxonomy id from a `taxid:NNN(organism name)` field, preferring the second
/// pipe-separated alternative when present. Placeholder fields (`-`) yield
/// `None`.
fn parse_taxid(raw: &str) -> Option<String> {
    if raw == "-" || raw.is_empty() {
        return None;
    }
    let segment = raw.split('|').nth(1).unwrap_or(raw);
    let rest = segment.split("taxid:").nth(1)?;
    let id: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '-')
        .collect();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// First interaction identifier, without the database prefix.
fn parse_interaction_id(raw: &str) -> String {
    raw.split('|')
        .next()
        .unwrap_or_default()
        .replace("intact:", "")
}

/// Interactor accession: strip the database prefix and any processed-chain
/// suffix (`uniprotkb:P0DTC2-PRO_0000449621` -> `P0DTC2`).
fn parse_interactor_id(raw: &str) -> String {
    let accession = raw.split(':').nth(1).unwrap_or(raw);
    accession
        .split("-PRO")
        .next()
        .unwrap_or(accession)
        .to_string()
}
