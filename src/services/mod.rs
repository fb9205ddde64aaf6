pub mod ensembl_lookup;

pub use ensembl_lookup::{normalize_organism, EnsemblLookup};
