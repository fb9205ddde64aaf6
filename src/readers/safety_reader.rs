use crate::error::{IntegrationError, Result};
use crate::models::table::{DataTable, Row};
use crate::readers::ensembl_reader::EnsemblReader;
use crate::utils::compress::open_input;
use serde_json::{json, Value};
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};

const KNOWN_SAFETY_SOURCE: &str = "known_target_safety";
const TOXICITY_SOURCE: &str = "experimental_toxicity";
const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone)]
struct SafetyEntry {
    name: String,
    has_safety_risk: bool,
    sources: Vec<String>,
    /// Affected organ systems; `None` renders as "N/A" for entries that only
    /// have experimental toxicity evidence.
    organs: Option<BTreeSet<String>>,
}

/// Builds the per-gene safety table from the known target safety file, the
/// experimental toxicity table and the parsed gene file (for gene name to
/// Ensembl id mapping).
pub struct SafetyReader {
    entries: HashMap<String, SafetyEntry>,
    order: Vec<String>,
}

impl SafetyReader {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn read(
        mut self,
        known_safety: &Path,
        toxicity: &Path,
        gene_file: &Path,
        all_targets: bool,
    ) -> Result<DataTable> {
        let genes = EnsemblReader::new().read_genes(gene_file)?;
        let name_map = Self::gene_name_map(&genes);

        self.collect_known_safety(known_safety, &name_map)?;
        self.collect_toxicity(toxicity)?;

        if all_targets {
            info!("outputting all targets");
            for gene in &genes {
                self.entry(&gene.ensembl_id, || SafetyEntry {
                    name: NOT_AVAILABLE.to_string(),
                    has_safety_risk: false,
                    sources: Vec::new(),
                    organs: None,
                });
            }
        }

        Ok(self.into_table())
    }

    /// Gene name to Ensembl ids; ambiguous names map to every carrier.
    fn gene_name_map(genes: &[crate::models::GeneRecord]) -> HashMap<String, Vec<String>> {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for gene in genes {
            if let Some(name) = &gene.name {
                map.entry(name.clone())
                    .or_default()
                    .push(gene.ensembl_id.clone());
            }
        }
        map
    }

    fn collect_known_safety(
        &mut self,
        path: &Path,
        name_map: &HashMap<String, Vec<String>>,
    ) -> Result<()> {
        let file = BufReader::new(File::open(path)?);
        let data: Value = serde_json::from_reader(file)?;
        let genes = data.as_object().ok_or_else(|| {
            IntegrationError::InvalidFormat(
                "known target safety file is not a JSON object".to_string(),
            )
        })?;

        for (gene_name, liabilities) in genes {
            let affected = Self::affected_systems(gene_name, liabilities);

            let Some(ensembl_ids) = name_map.get(gene_name) else {
                continue;
            };
            for ensembl_id in ensembl_ids {
                let entry = self.entry(ensembl_id, || SafetyEntry {
                    name: gene_name.clone(),
                    has_safety_risk: true,
                    sources: vec![KNOWN_SAFETY_SOURCE.to_string()],
                    organs: Some(BTreeSet::new()),
                });
                entry
                    .organs
                    .get_or_insert_with(BTreeSet::new)
                    .extend(affected.iter().cloned());
            }
        }
        Ok(())
    }

    /// Organ systems affected across every liability section, preferring the
    /// curated ontology term over the wording used in the paper.
    fn affected_systems(gene_name: &str, liabilities: &Value) -> BTreeSet<String> {
        let mut affected = BTreeSet::new();
        let sections = liabilities
            .as_object()
            .map(|m| m.values().collect::<Vec<_>>())
            .unwrap_or_default();
        for effects in sections.iter().filter_map(|s| s.as_array()).flatten() {
            let systems = effects
                .get("organs_systems_affected")
                .and_then(Value::as_array);
            for system in systems.into_iter().flatten() {
                let mapped = system
                    .get("mapped_term")
                    .and_then(Value::as_str)
                    .filter(|term| !term.is_empty());
                match mapped {
                    Some(term) => {
                        affected.insert(term.to_string());
                    }
                    None => {
                        if let Some(term) =
                            system.get("term_in_paper").and_then(Value::as_str)
                        {
                            warn!(
                                gene = gene_name,
                                term,
                                "organ system is not mapped to an ontology term, using the term from the paper"
                            );
                            affected.insert(term.to_string());
                        }
                    }
                }
            }
        }
        affected
    }

    /// Experimental toxicity table: headered TSV whose first column is the
    /// Ensembl gene id.
    fn collect_toxicity(&mut self, path: &Path) -> Result<()> {
        let input = open_input(path)?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_reader(input);

        for record in reader.records() {
            let record = record?;
            let Some(ensembl_id) = record.get(0).filter(|id| !id.is_empty()) else {
                continue;
            };
            let entry = self.entry(ensembl_id, || SafetyEntry {
                name: NOT_AVAILABLE.to_string(),
                has_safety_risk: true,
                sources: Vec::new(),
                organs: None,
            });
            if !entry.sources.iter().any(|s| s == TOXICITY_SOURCE) {
                entry.sources.push(TOXICITY_SOURCE.to_string());
            }
        }
        Ok(())
    }

    fn entry(
        &mut self,
        ensembl_id: &str,
        default: impl FnOnce() -> SafetyEntry,
    ) -> &mut SafetyEntry {
        if !self.entries.contains_key(ensembl_id) {
            self.order.push(ensembl_id.to_string());
        }
        self.entries
            .entry(ensembl_id.to_string())
            .or_insert_with(default)
    }

    fn into_table(self) -> DataTable {
        let mut table = DataTable::with_columns(vec![
            "id",
            "name",
            "has_safety_risk",
            "safety_info_source",
            "safety_organs_systems_affected",
        ]);
        for ensembl_id in &self.order {
            let entry = &self.entries[ensembl_id];
            let sources = if entry.sources.is_empty() {
                json!(NOT_AVAILABLE)
            } else {
                json!(entry.sources)
            };
            let organs = match &entry.organs {
                Some(organs) => json!(organs.iter().collect::<Vec<_>>()),
                None => json!(NOT_AVAILABLE),
            };

            let mut row = Row::new();
            row.insert("id".into(), json!(ensembl_id));
            row.insert("name".into(), json!(entry.name));
            row.insert("has_safety_risk".into(), json!(entry.has_safety_risk));
            row.insert("safety_info_source".into(), sources);
            row.insert("safety_organs_systems_affected".into(), organs);
            table.push_row(row);
        }
        table
    }
}

impl Default for SafetyReader {
    fn default() -> Self {
        Self::new()
    }
}
