//! Schema Normalizer CLI
//!
//! Loads the WebExtension schema files, runs the fix pipeline and writes the
//! normalized namespaces for the declaration renderer.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use webext_schemas::{export, load_schema_dir, normalize, NormalizeConfig, Pipeline};

#[derive(Parser)]
#[command(name = "schema-normalize")]
#[command(about = "Normalize WebExtension API schema files")]
struct Cli {
    /// Configuration file (layered over normalize.toml and NORMALIZE__* variables)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Override the schema directory
    #[arg(short, long, global = true)]
    schemas: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load, normalize, verify and export
    Run {
        /// Override the output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load, normalize and verify without writing anything
    Check,

    /// Inspect or create the configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration
    Show {
        /// Print as TOML (default)
        #[arg(long, conflicts_with = "json")]
        toml: bool,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the default configuration to a file
    Init {
        #[arg(short, long, default_value = "normalize.toml")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<NormalizeConfig> {
    let mut config = NormalizeConfig::load_from(cli.config.as_deref()).context("loading configuration")?;
    if let Some(schemas) = &cli.schemas {
        config.input.schema_dir = schemas.clone();
    }
    Ok(config)
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Run { output } => {
            let mut config = load_config(&cli)?;
            if let Some(output) = output {
                config.output.dir = output.clone();
            }

            let mut bundle = load_schema_dir(&config.input)
                .with_context(|| format!("loading schemas from {}", config.input.schema_dir.display()))?;
            println!("📂 Loaded {} namespaces from {} files", bundle.namespaces.len(), bundle.files);

            normalize(&config, &mut bundle.namespaces)?;
            let written = export::export(&bundle.namespaces, Some(&bundle.checksum), &config.output)?;

            println!("✅ Wrote {} files to {}", written.len(), config.output.dir.display());
            println!("   Checksum: {}", bundle.checksum);
            Ok(())
        }

        Commands::Check => {
            let config = load_config(&cli)?;
            let mut bundle = load_schema_dir(&config.input)
                .with_context(|| format!("loading schemas from {}", config.input.schema_dir.display()))?;
            let before = bundle.namespaces.len();

            normalize(&config, &mut bundle.namespaces)?;

            let types: usize = bundle
                .namespaces
                .iter()
                .map(|ns| ns.entry.types.as_ref().map_or(0, Vec::len))
                .sum();
            println!("🔍 Schema check");
            println!("  Files:      {}", bundle.files);
            println!("  Namespaces: {} loaded, {} after normalization", before, bundle.namespaces.len());
            println!("  Types:      {}", types);
            println!("  Fixes:      {}", Pipeline::from_config(&config)?.names().len());
            println!("  Checksum:   {}", bundle.checksum);
            println!();
            println!("✅ All fixes applied and references resolved");
            Ok(())
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show { json, .. } => {
                let config = load_config(&cli)?;
                if *json {
                    println!("{}", serde_json::to_string_pretty(&config)?);
                } else {
                    println!("{}", toml::to_string_pretty(&config)?);
                }
                Ok(())
            }

            ConfigCommands::Init { output } => {
                if output.exists() {
                    anyhow::bail!("{} already exists", output.display());
                }
                NormalizeConfig::default()
                    .save(output)
                    .with_context(|| format!("writing {}", output.display()))?;
                println!("✅ Wrote default configuration to {}", output.display());
                Ok(())
            }
        },
    }
}
