use crate::cli::args::{Cli, Commands, Entity};
use crate::error::{IntegrationError, Result};
use crate::models::table::DataTable;
use crate::processors::{DataIntegrator, MergeConfig};
use crate::readers::{
    ComplexPortalReader, DrugEvidenceReader, EnsemblReader, HpaReader, IdMapReader, IntactReader,
    SafetyReader, TableReader, TractabilityReader, UniprotReader,
};
use crate::services::EnsemblLookup;
use crate::utils::generate_default_output_filename;
use crate::utils::progress::ProgressReporter;
use crate::writers::TableWriter;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Integrate {
            reference,
            config,
            input_dir,
            output,
            entity,
        } => {
            integrate(&reference, &config, &input_dir, output, entity)?;
        }

        Commands::ParseEnsembl { input, output } => {
            println!("Parsing Ensembl gene dump: {}", input.display());
            let reader = EnsemblReader::new();
            let genes = reader.read_raw_dump(&input)?;
            reader.write_genes(&genes, &output)?;
            println!("{} genes written to {}", genes.len(), output.display());
        }

        Commands::ParseUniprot { input, output } => {
            println!("Parsing UniProtKB export: {}", input.display());
            let reader = UniprotReader::new(EnsemblLookup::new());
            let table = reader.read(&input).await?;
            write_table(&table, &output)?;
        }

        Commands::ParseIntact {
            input,
            mapfile,
            output,
        } => {
            println!("Parsing interaction network: {}", input.display());
            let pairs = IdMapReader::new().read_uniprot_map(&mapfile)?;
            let id_map = IdMapReader::as_multimap(&pairs);
            let table = IntactReader::new().read(&input, &id_map)?;
            write_table(&table, &output)?;
        }

        Commands::ParseComplexPortal { input, output } => {
            println!("Parsing Complex Portal export: {}", input.display());
            let reader = ComplexPortalReader::new(EnsemblLookup::new());
            let table = reader.read(&input).await?;
            write_table(&table, &output)?;
        }

        Commands::ParseHpa { input, output } => {
            println!("Parsing Human Protein Atlas export: {}", input.display());
            let table = HpaReader::new().read(&input)?;
            write_table(&table, &output)?;
        }

        Commands::ParseTractability { input, output } => {
            println!("Parsing tractability export: {}", input.display());
            let table = TractabilityReader::new().read(&input)?;
            write_table(&table, &output)?;
        }

        Commands::ParseSafety {
            known_safety,
            toxicity,
            gene_file,
            output,
            all_targets,
        } => {
            println!("Parsing target safety files");
            let table = SafetyReader::new().read(&known_safety, &toxicity, &gene_file, all_targets)?;
            write_table(&table, &output)?;
        }

        Commands::ParseDrugInfo {
            input,
            output,
            entity,
        } => {
            println!("Aggregating drug evidence: {}", input.display());
            let reader = DrugEvidenceReader::new();
            let records = reader.read_records(&input)?;
            let table = match entity {
                Entity::Target => reader.target_summary(&records),
                Entity::Drug => reader.drug_summary(&records),
            };
            write_table(&table, &output)?;
        }

        Commands::BuildIdMap {
            ensembl_map,
            uniprot_map,
            output,
        } => {
            println!("Building the identifier map");
            let table = IdMapReader::new().build(&uniprot_map, &ensembl_map)?;
            write_table(&table, &output)?;
        }
    }

    Ok(())
}

fn integrate(
    reference: &Path,
    config: &Path,
    input_dir: &Path,
    output: Option<PathBuf>,
    entity: Entity,
) -> Result<()> {
    println!("Integrating parsed datasets...");
    println!("Reference file: {}", reference.display());
    println!("Input directory: {}", input_dir.display());

    let base = load_reference(reference, entity)?;
    println!("Reference table: {} rows", base.len());
    let mut integrator = DataIntegrator::new(base)?;

    let config_text = fs::read_to_string(config)?;
    let recipes: HashMap<String, MergeConfig> =
        serde_json::from_str(&config_text).map_err(|e| {
            IntegrationError::Config(format!("invalid configuration document: {}", e))
        })?;
    for recipe in recipes.values() {
        recipe.validate()?;
    }

    // Key order in the document is not preserved by the deserializer, so
    // merges run in sorted source-file order.
    let mut sources: Vec<(String, MergeConfig)> = recipes.into_iter().collect();
    sources.sort_by(|a, b| a.0.cmp(&b.0));

    let progress = ProgressReporter::new_spinner("Merging datasets...", false);
    for (source_file, recipe) in sources {
        progress.set_message(&format!("Merging {}...", source_file));

        let aux = TableReader::new().read(&input_dir.join(&source_file))?;
        let duplicates = aux.duplicate_keys();
        if !duplicates.is_empty() {
            warn!(
                source = %source_file,
                duplicates = duplicates.len(),
                "auxiliary table has duplicate ids; matching rows will be duplicated by the join"
            );
        }

        integrator.add_data(aux, &recipe)?;
        let merged = integrator.get_integrated_data();
        progress.println(&format!(
            "Merged {}: {} rows, {} columns",
            source_file,
            merged.len(),
            merged.columns().len()
        ));
    }
    progress.finish_with_message("All datasets merged");

    let output = output.unwrap_or_else(generate_default_output_filename);
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    integrator.save_integrated(&output)?;
    println!("Integrated table written to {}", output.display());

    Ok(())
}

/// The reference dataset: the parsed gene file for targets, a generic parsed
/// table for drugs.
fn load_reference(path: &Path, entity: Entity) -> Result<DataTable> {
    match entity {
        Entity::Target => {
            let reader = EnsemblReader::new();
            let genes = reader.read_genes(path)?;
            Ok(reader.reference_table(&genes))
        }
        Entity::Drug => TableReader::new().read(path),
    }
}

fn write_table(table: &DataTable, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    TableWriter::new().write(table, output)?;
    println!("{} rows written to {}", table.len(), output.display());
    Ok(())
}
