//! Ontology Generator CLI
//!
//! Loads a schema, validates it, builds the ontology and runs every backend
//! for the target language.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ontogen::{
    backends_for, build, execute_all, load_schema, validate, CompilerConfig, FsWriter, Strictness,
};

#[derive(Parser)]
#[command(name = "ontogen-generate")]
#[command(about = "Generate code from an ontology schema")]
struct Cli {
    /// Schema name
    #[arg(short = 's', long)]
    schema: String,

    /// Schema version, or "latest"
    #[arg(short = 'v', long, default_value = "latest")]
    version: String,

    /// Target language (defaults to the configured language)
    #[arg(short = 'l', long)]
    language: Option<String>,

    /// Output directory (defaults to the configured directory)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Directory holding the schemas
    #[arg(long)]
    schemas: Option<PathBuf>,

    /// Explicit config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Refuse to generate while references dangle
    #[arg(long)]
    strict: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when the schema failed validation
fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = CompilerConfig::load_from(cli.config.as_deref()).context("loading configuration")?;

    let schemas_dir = cli.schemas.unwrap_or_else(|| config.schemas.dir.clone());
    let mut options = config.generation_options();
    if let Some(language) = cli.language {
        options.language = language;
    }
    if let Some(output) = cli.output {
        options.output_dir = output;
    }
    if cli.strict {
        options.strictness = Strictness::Strict;
    }

    println!("🔍 Loading {} {} from {}", cli.schema, cli.version, schemas_dir.display());
    let raw = load_schema(&schemas_dir, &cli.schema, &cli.version)?;

    let errors = validate(&raw);
    if !errors.is_empty() {
        for error in &errors {
            println!("{}", error);
        }
        println!("❌ {} validation error(s)", errors.len());
        return Ok(false);
    }

    let ontology = build(&raw)?;
    let diagnostics = ontology.diagnostics();
    if !diagnostics.is_empty() {
        print!("{}", diagnostics);
    }

    let mut backends = backends_for(&options.language)?;
    let writer = FsWriter::new(&options.output_dir);
    let reports = execute_all(&ontology, &mut backends, &options, &writer)?;

    for report in &reports {
        println!("  ✅ {}", report);
    }
    println!(
        "✅ Generated {} v{} ({}) into {}",
        ontology.name,
        ontology.version,
        options.language,
        options.output_dir.display()
    );
    Ok(true)
}
