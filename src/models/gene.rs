use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

use crate::models::table::{DataTable, Row};

/// One gene from the Ensembl dump, as stored in the parsed gene file.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GeneRecord {
    #[validate(length(min = 1))]
    pub id: String,

    pub ensembl_id: String,

    pub biotype: Option<String>,

    pub name: Option<String>,

    pub taxon_id: Option<i64>,

    #[serde(rename = "PDB", default)]
    pub pdb: Vec<String>,

    pub description: Option<String>,

    #[serde(rename = "MIM_morbidity", default)]
    pub mim_morbidity: Vec<MimMorbidity>,

    #[serde(default)]
    pub uniprot_ids: Vec<String>,
}

/// MIM morbidity cross-reference attached to a gene.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MimMorbidity {
    pub display_id: String,
    pub primary_id: String,
}

impl GeneRecord {
    /// Extract the relevant fields from one raw Ensembl JSON gene entry.
    /// Entries without a gene id are unusable and yield `None`.
    pub fn from_ensembl_json(data: &Value) -> Option<Self> {
        let id = data.get("id")?.as_str()?.to_string();

        Some(Self {
            ensembl_id: id.clone(),
            id,
            biotype: string_field(data, "biotype"),
            name: string_field(data, "name"),
            taxon_id: data.get("taxon_id").and_then(Value::as_i64),
            pdb: string_list(data.get("PDB")),
            description: string_field(data, "description"),
            mim_morbidity: mim_morbidity(data.get("xrefs")),
            uniprot_ids: uniprot_ids(data),
        })
    }

    /// Row for the reference table: list fields flattened to comma-joined
    /// strings, structure cross-references dropped.
    pub fn to_reference_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), json!(self.id));
        row.insert("ensembl_id".into(), json!(self.ensembl_id));
        row.insert("biotype".into(), json!(self.biotype));
        row.insert("name".into(), json!(self.name));
        row.insert("taxon_id".into(), json!(self.taxon_id));
        row.insert("description".into(), json!(self.description));
        row.insert(
            "MIM_morbidity".into(),
            join_or_null(self.mim_morbidity.iter().map(|m| m.display_id.as_str())),
        );
        row.insert(
            "uniprot_ids".into(),
            join_or_null(self.uniprot_ids.iter().map(String::as_str)),
        );
        row
    }

    pub fn reference_columns() -> Vec<&'static str> {
        vec![
            "id",
            "ensembl_id",
            "biotype",
            "name",
            "taxon_id",
            "description",
            "MIM_morbidity",
            "uniprot_ids",
        ]
    }

    /// Build the reference table every auxiliary dataset is merged into.
    pub fn reference_table(genes: &[GeneRecord]) -> DataTable {
        let mut table = DataTable::with_columns(Self::reference_columns());
        for gene in genes {
            table.push_row(gene.to_reference_row());
        }
        table
    }
}

fn join_or_null<'a>(items: impl Iterator<Item = &'a str>) -> Value {
    let joined = items.collect::<Vec<_>>().join(",");
    if joined.is_empty() {
        Value::Null
    } else {
        Value::String(joined)
    }
}

fn string_field(data: &Value, field: &str) -> Option<String> {
    data.get(field).and_then(Value::as_str).map(String::from)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn mim_morbidity(xrefs: Option<&Value>) -> Vec<MimMorbidity> {
    let mut morbidities = Vec::new();
    if let Some(xrefs) = xrefs.and_then(Value::as_array) {
        for xref in xrefs {
            if xref.get("dbname").and_then(Value::as_str) == Some("MIM_MORBID") {
                if let (Some(display_id), Some(primary_id)) = (
                    xref.get("display_id").and_then(Value::as_str),
                    xref.get("primary_id").and_then(Value::as_str),
                ) {
                    morbidities.push(MimMorbidity {
                        display_id: display_id.to_string(),
                        primary_id: primary_id.to_string(),
                    });
                }
            }
        }
    }
    morbidities
}

/// Accessions pooled across the three UniProt cross-reference sections,
/// deduplicated and sorted.
fn uniprot_ids(data: &Value) -> Vec<String> {
    let mut ids = Vec::new();
    for section in ["Uniprot_gn", "Uniprot/SPTREMBL", "Uniprot/SWISSPROT"] {
        ids.extend(string_list(data.get(section)));
    }
    ids.sort();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_gene() -> Value {
        json!({
            "id": "ENSG00000130234",
            "biotype": "protein_coding",
            "name": "ACE2",
            "taxon_id": 9606,
            "description": "angiotensin converting enzyme 2",
            "PDB": ["1R42", "6M17"],
            "xrefs": [
                {"dbname": "MIM_MORBID", "display_id": "MIM:610938", "primary_id": "610938"},
                {"dbname": "HGNC", "display_id": "ACE2", "primary_id": "HGNC:13557"}
            ],
            "Uniprot_gn": ["Q9BYF1"],
            "Uniprot/SWISSPROT": ["Q9BYF1"],
            "Uniprot/SPTREMBL": ["A0A0A0MSN4"]
        })
    }

    #[test]
    fn test_from_ensembl_json() {
        let gene = GeneRecord::from_ensembl_json(&raw_gene()).unwrap();

        assert_eq!(gene.id, "ENSG00000130234");
        assert_eq!(gene.ensembl_id, "ENSG00000130234");
        assert_eq!(gene.name.as_deref(), Some("ACE2"));
        assert_eq!(gene.taxon_id, Some(9606));
        assert_eq!(gene.pdb, vec!["1R42", "6M17"]);
        assert_eq!(gene.mim_morbidity.len(), 1);
        assert_eq!(gene.mim_morbidity[0].display_id, "MIM:610938");
        // Duplicates across the UniProt sections collapse to one accession.
        assert_eq!(gene.uniprot_ids, vec!["A0A0A0MSN4", "Q9BYF1"]);
        assert!(gene.validate().is_ok());
    }

    #[test]
    fn test_missing_id_is_rejected() {
        let raw = json!({"name": "ACE2"});
        assert!(GeneRecord::from_ensembl_json(&raw).is_none());
    }

    #[test]
    fn test_reference_row_flattens_lists() {
        let gene = GeneRecord::from_ensembl_json(&raw_gene()).unwrap();
        let row = gene.to_reference_row();

        assert_eq!(row["MIM_morbidity"], json!("MIM:610938"));
        assert_eq!(row["uniprot_ids"], json!("A0A0A0MSN4,Q9BYF1"));
        assert!(!row.contains_key("PDB"));
    }

    #[test]
    fn test_reference_row_empty_lists_are_null() {
        let raw = json!({"id": "ENSG00000000001"});
        let gene = GeneRecord::from_ensembl_json(&raw).unwrap();
        let row = gene.to_reference_row();

        assert_eq!(row["MIM_morbidity"], Value::Null);
        assert_eq!(row["uniprot_ids"], Value::Null);
    }
}
