//! sdslc: command-line host for the SDSL specification compiler.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::Result;
use serde_json::Value;

use sdsl_compiler::config::CompilerConfig;
use sdsl_compiler::error::{SdslError, SdslResult, ValidationError};
use sdsl_compiler::validate::{validate_compiler_input, validate_specification};

#[derive(Parser)]
#[command(name = "sdslc", version, about = "SDSL specification compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a specification into the artifact bundle.
    Compile {
        /// Specification JSON file.
        #[arg(long)]
        spec: PathBuf,

        /// Compiler input JSON file. Defaults to the config's [context].
        #[arg(long)]
        input: Option<PathBuf>,

        /// Compiler config TOML file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output file. Defaults to stdout.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Pretty-print the bundle regardless of the config.
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a specification (and optionally a compiler input) without compiling.
    Validate {
        /// Specification JSON file.
        #[arg(long)]
        spec: PathBuf,

        /// Compiler input JSON file.
        #[arg(long)]
        input: Option<PathBuf>,
    },

    /// Write a default compiler config.
    InitConfig {
        /// Destination path.
        #[arg(long, default_value = "sdslc.toml")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            spec,
            input,
            config,
            out,
            pretty,
        } => {
            let config = match config {
                Some(path) => CompilerConfig::load(&path).map_err(SdslError::from)?,
                None => CompilerConfig::default(),
            };
            let raw_spec = read_json(&spec)?;
            let raw_input = match input {
                Some(path) => read_json(&path)?,
                None => config.compiler_input(),
            };

            let bundle = config.compiler().compile_json(&raw_spec, &raw_input)?;

            let encoded = if pretty || config.output.pretty {
                serde_json::to_string_pretty(&bundle)
            } else {
                serde_json::to_string(&bundle)
            }
            .map_err(|e| SdslError::Encode {
                message: e.to_string(),
            })?;

            match out {
                Some(path) => {
                    write_file(&path, &encoded)?;
                    println!("Compiled {} into {}", bundle.specification.id, path.display());
                }
                None => println!("{encoded}"),
            }
        }

        Commands::Validate { spec, input } => {
            let spec = validate_specification(&read_json(&spec)?)?;
            println!(
                "Specification \"{}\" is valid ({} models, {} features, {} ontologies).",
                spec.id,
                spec.models.len(),
                spec.features.len(),
                spec.ontologies.len()
            );
            if let Some(path) = input {
                let input = validate_compiler_input(&read_json(&path)?)?;
                println!(
                    "Compiler input is valid (user {}, database {}).",
                    input.user.username, input.database_id
                );
            }
        }

        Commands::InitConfig { path } => {
            CompilerConfig::default()
                .save(&path)
                .map_err(SdslError::from)?;
            println!("Wrote default config to {}", path.display());
        }
    }

    Ok(())
}

fn read_json(path: &Path) -> SdslResult<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| SdslError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    serde_json::from_str(&content).map_err(|e| {
        ValidationError::Structure {
            path: "$".into(),
            message: format!("{}: {e}", path.display()),
        }
        .into()
    })
}

fn write_file(path: &Path, content: &str) -> SdslResult<()> {
    std::fs::write(path, content).map_err(|e| SdslError::Io {
        path: path.display().to_string(),
        source: e,
    })
}
