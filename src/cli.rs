use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info, warn};
use std::path::PathBuf;

use crate::config::Config;
use crate::extractor::recorded::Recording;
use crate::serializer::{serialize_json, serialize_yaml, write_to_file};
use crate::service::AutoDoc;

/// OpenAPI from traffic - Build OpenAPI documentation from observed HTTP exchanges
#[derive(Parser, Debug)]
#[command(name = "openapi-from-traffic")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Configuration file (YAML, or JSON by extension)
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        default_value = "autodoc.yaml",
        global = true
    )]
    pub config_path: PathBuf,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the final document merged with the configured supplements
    Read {
        /// Output format (json or yaml)
        #[arg(short = 'f', long = "format", value_enum, default_value = "json")]
        output_format: OutputFormat,

        /// Output file path (if not specified, outputs to stdout)
        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output_path: Option<PathBuf>,
    },
    /// Save the accumulated document as the final document
    Flush,
    /// Replay a recording of exchanges into the document, then flush
    Replay {
        /// Recording file (JSON)
        #[arg(value_name = "FILE")]
        recording: PathBuf,
    },
}

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.config_path.is_file() {
        anyhow::bail!(
            "Configuration file does not exist: {}",
            args.config_path.display()
        );
    }
    if let Command::Replay { recording } = &args.command {
        if !recording.is_file() {
            anyhow::bail!("Recording file does not exist: {}", recording.display());
        }
    }

    info!("Configuration: {}", args.config_path.display());
    Ok(args)
}

/// Run the selected command
pub fn run(args: CliArgs) -> Result<()> {
    let mut config = Config::load(&args.config_path)
        .with_context(|| format!("Failed to load configuration {}", args.config_path.display()))?;

    match args.command {
        Command::Read {
            output_format,
            output_path,
        } => {
            let autodoc = AutoDoc::new(config).context("Invalid configuration")?;
            let document = autodoc.read().context("Failed to read documentation")?;

            info!("Serializing to {:?} format...", output_format);
            let content = match output_format {
                OutputFormat::Json => serialize_json(&document)?,
                OutputFormat::Yaml => serialize_yaml(&document)?,
            };

            if let Some(output_path) = &output_path {
                info!("Writing output to: {}", output_path.display());
                write_to_file(&content, output_path)?;
            } else {
                println!("{}", content);
            }
        }
        Command::Flush => {
            if config.driver == "local" {
                warn!("The local driver keeps observations in memory; flushing from a new process saves an empty document");
            }
            let autodoc = AutoDoc::new(config).context("Invalid configuration")?;
            let document = autodoc.flush().context("Failed to save documentation")?;
            info!("Flushed {} operations", document.operation_count());
        }
        Command::Replay { recording } => {
            let recording = Recording::load(&recording)
                .with_context(|| format!("Failed to load recording {}", recording.display()))?;

            config.enabled = true;
            let autodoc = AutoDoc::new(config).context("Invalid configuration")?;

            let mut recorded = 0;
            for (index, exchange) in recording.exchanges.iter().enumerate() {
                let (request, response) = exchange
                    .to_captured()
                    .with_context(|| format!("Exchange #{} is invalid", index))?;
                if autodoc.observe(&request, &response, &recording)? {
                    recorded += 1;
                } else {
                    debug!("Exchange #{} was not documented", index);
                }
            }

            let document = autodoc.flush().context("Failed to save documentation")?;
            info!("Replay complete!");
            info!("Summary:");
            info!("  - Exchanges replayed: {}", recording.exchanges.len());
            info!("  - Exchanges documented: {}", recorded);
            info!("  - Operations: {}", document.operation_count());
        }
    }

    Ok(())
}
