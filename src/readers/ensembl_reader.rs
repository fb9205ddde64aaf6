use crate::error::Result;
use crate::models::gene::GeneRecord;
use crate::models::table::DataTable;
use crate::utils::compress::{create_output, is_gzip_path, open_input};
use serde_json::Value;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::{info, warn};

/// Reader for Ensembl gene dumps: the raw line-delimited JSON export, and the
/// parsed gene file this pipeline writes from it.
pub struct EnsemblReader;

impl EnsemblReader {
    pub fn new() -> Self {
        Self
    }

    /// Parse the raw Ensembl JSON dump (one gene object per line, optionally
    /// gzipped). Lines without a gene id are skipped and counted.
    pub fn read_raw_dump(&self, path: &Path) -> Result<Vec<GeneRecord>> {
        let input = open_input(path)?;
        let mut genes = Vec::new();
        let mut skipped = 0usize;

        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let data: Value = serde_json::from_str(&line)?;
            match GeneRecord::from_ensembl_json(&data) {
                Some(gene) => genes.push(gene),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(skipped, "gene entries without an id were skipped");
        }
        info!(genes = genes.len(), "Ensembl dump read");
        Ok(genes)
    }

    /// Read the parsed gene file (gzipped line-delimited JSON of
    /// [`GeneRecord`]s).
    pub fn read_genes(&self, path: &Path) -> Result<Vec<GeneRecord>> {
        let input = open_input(path)?;
        let mut genes = Vec::new();
        for line in input.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            genes.push(serde_json::from_str(&line)?);
        }
        Ok(genes)
    }

    /// Write the parsed gene file, gzipped when the path asks for it.
    pub fn write_genes(&self, genes: &[GeneRecord], path: &Path) -> Result<()> {
        let mut output = create_output(path, is_gzip_path(path))?;
        for gene in genes {
            serde_json::to_writer(&mut output, gene)?;
            writeln!(output)?;
        }
        output.flush()?;
        Ok(())
    }

    /// Build the reference table the integrator starts from.
    pub fn reference_table(&self, genes: &[GeneRecord]) -> DataTable {
        GeneRecord::reference_table(genes)
    }
}

impl Default for EnsemblReader {
    fn default() -> Self {
        Self::new()
    }
}
