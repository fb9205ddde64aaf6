pub mod drug;
pub mod gene;
pub mod table;

pub use drug::DrugEvidenceRecord;
pub use gene::{GeneRecord, MimMorbidity};
pub use table::{DataTable, Row, KEY_COLUMN};
