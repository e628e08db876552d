//! Schema Validator CLI
//!
//! Runs the validation gate only. Exits non-zero when the schema has errors.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ontogen::{build, load_schema, validate, CompilerConfig};

#[derive(Parser)]
#[command(name = "ontogen-validate")]
#[command(about = "Validate an ontology schema")]
struct Cli {
    /// Schema name
    #[arg(short = 's', long)]
    schema: String,

    /// Schema version, or "latest"
    #[arg(short = 'v', long, default_value = "latest")]
    version: String,

    /// Directory holding the schemas
    #[arg(long)]
    schemas: Option<PathBuf>,

    /// Explicit config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also build the ontology and report unresolved references
    #[arg(long)]
    resolve: bool,
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

fn run(cli: Cli) -> anyhow::Result<bool> {
    let config = CompilerConfig::load_from(cli.config.as_deref())?;
    let schemas_dir = cli.schemas.unwrap_or(config.schemas.dir);

    println!("🔍 Validating {} {}", cli.schema, cli.version);
    let raw = load_schema(&schemas_dir, &cli.schema, &cli.version)?;

    let errors = validate(&raw);
    for error in &errors {
        println!("{}", error);
    }
    if !errors.is_empty() {
        println!("❌ {} validation error(s)", errors.len());
        return Ok(false);
    }

    println!(
        "✅ {} v{}: {} package(s), {} type(s)",
        raw.name,
        raw.version,
        raw.packages.len(),
        raw.factory_count()
    );

    if cli.resolve {
        let ontology = build(&raw)?;
        let diagnostics = ontology.diagnostics();
        if diagnostics.is_empty() {
            println!("✅ All references resolved");
        } else {
            print!("{}", diagnostics);
        }
    }
    Ok(true)
}
