use serde::{Deserialize, Serialize};
use validator::Validate;

/// One row of the drug evidence export: a drug tested against a target for a
/// disease, at a given clinical trial phase.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DrugEvidenceRecord {
    #[validate(length(min = 1))]
    pub id: String,

    pub disease_id: Option<String>,

    #[validate(length(min = 1))]
    pub drug_id: String,

    #[validate(range(min = 0, max = 4))]
    pub phase: i64,

    pub moa: Option<String>,

    pub drug_name: Option<String>,
}

impl DrugEvidenceRecord {
    pub fn new(id: &str, disease_id: &str, drug_id: &str, phase: i64) -> Self {
        Self {
            id: id.to_string(),
            disease_id: Some(disease_id.to_string()),
            drug_id: drug_id.to_string(),
            phase,
            moa: None,
            drug_name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_range_validation() {
        let record = DrugEvidenceRecord::new("ENSG00000130234", "EFO_0007157", "CHEMBL1201585", 4);
        assert!(record.validate().is_ok());

        let record = DrugEvidenceRecord::new("ENSG00000130234", "EFO_0007157", "CHEMBL1201585", 7);
        assert!(record.validate().is_err());
    }
}
