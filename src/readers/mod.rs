pub mod complex_reader;
pub mod drug_reader;
pub mod ensembl_reader;
pub mod hpa_reader;
pub mod id_map_reader;
pub mod intact_reader;
pub mod safety_reader;
pub mod table_reader;
pub mod tractability_reader;
pub mod uniprot_reader;

pub use complex_reader::ComplexPortalReader;
pub use drug_reader::DrugEvidenceReader;
pub use ensembl_reader::EnsemblReader;
pub use hpa_reader::HpaReader;
pub use id_map_reader::IdMapReader;
pub use intact_reader::IntactReader;
pub use safety_reader::SafetyReader;
pub use table_reader::TableReader;
pub use tractability_reader::TractabilityReader;
pub use uniprot_reader::UniprotReader;
