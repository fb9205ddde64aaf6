use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "covid-target-integrator")]
#[command(about = "Parses biomedical source exports and integrates them into a single COVID-19 target table")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Entity {
    Target,
    Drug,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Join the parsed datasets onto the reference table
    Integrate {
        #[arg(short, long, help = "Parsed reference file (gzipped line-delimited JSON)")]
        reference: PathBuf,

        #[arg(short, long, help = "JSON configuration with one merge recipe per source file")]
        config: PathBuf,

        #[arg(short, long, help = "Folder the parsed source files are read from")]
        input_dir: PathBuf,

        #[arg(
            short,
            long,
            help = "Output file path [default: output/covid-target-list-{YYMMDD}.tsv]"
        )]
        output: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value = "target")]
        entity: Entity,
    },

    /// Parse the raw Ensembl JSON gene dump
    ParseEnsembl {
        #[arg(short, long, help = "Ensembl JSON dump (one gene per line)")]
        input: PathBuf,

        #[arg(short, long, help = "Parsed gene file (gzipped line-delimited JSON)")]
        output: PathBuf,
    },

    /// Parse the UniProtKB JSON export and map accessions to gene ids
    ParseUniprot {
        #[arg(short, long, help = "UniProtKB JSON export")]
        input: PathBuf,

        #[arg(short, long, help = "Output file name")]
        output: PathBuf,
    },

    /// Parse the interaction network TSV export
    ParseIntact {
        #[arg(short, long, help = "Interaction network TSV export")]
        input: PathBuf,

        #[arg(short, long, help = "UniProt id-mapping file")]
        mapfile: PathBuf,

        #[arg(short, long, help = "Output file name")]
        output: PathBuf,
    },

    /// Parse the Complex Portal TSV export
    ParseComplexPortal {
        #[arg(short, long, help = "Complex Portal TSV export")]
        input: PathBuf,

        #[arg(short, long, help = "Output file name")]
        output: PathBuf,
    },

    /// Parse the Human Protein Atlas JSON export
    ParseHpa {
        #[arg(short, long, help = "HPA JSON export (one gene per line)")]
        input: PathBuf,

        #[arg(short, long, help = "Output file name")]
        output: PathBuf,
    },

    /// Parse the target tractability TSV export
    ParseTractability {
        #[arg(short, long, help = "Tractability TSV export")]
        input: PathBuf,

        #[arg(short, long, help = "Output file name")]
        output: PathBuf,
    },

    /// Parse the target safety and experimental toxicity files
    ParseSafety {
        #[arg(short, long, help = "Known target safety JSON file")]
        known_safety: PathBuf,

        #[arg(short = 'e', long, help = "Experimental toxicity TSV file")]
        toxicity: PathBuf,

        #[arg(short, long, help = "Parsed gene file for name mapping")]
        gene_file: PathBuf,

        #[arg(short, long, help = "Output file name")]
        output: PathBuf,

        #[arg(short, long, help = "Output all targets, not only those with safety information")]
        all_targets: bool,
    },

    /// Aggregate the drug evidence export per target or per drug
    ParseDrugInfo {
        #[arg(short, long, help = "Drug evidence TSV export")]
        input: PathBuf,

        #[arg(short, long, help = "Output file name")]
        output: PathBuf,

        #[arg(short, long, value_enum, help = "Entity to aggregate evidence for")]
        entity: Entity,
    },

    /// Build the unified UniProt to Ensembl identifier map
    BuildIdMap {
        #[arg(short, long, help = "Ensembl-derived identifier map (TSV)")]
        ensembl_map: PathBuf,

        #[arg(short, long, help = "UniProt id-mapping export (TSV)")]
        uniprot_map: PathBuf,

        #[arg(short, long, help = "Output file name")]
        output: PathBuf,
    },
}
