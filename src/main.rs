//! OpenAPI from traffic - command-line tool for the documentation store.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-traffic [OPTIONS] <COMMAND>
//! ```
//!
//! # Examples
//!
//! Replay recorded traffic and save the result:
//! ```bash
//! openapi-from-traffic -c autodoc.yaml replay traffic.json
//! ```
//!
//! Print the merged document as YAML:
//! ```bash
//! openapi-from-traffic -c autodoc.yaml read -f yaml
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! openapi-from-traffic -c autodoc.yaml flush -v
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_traffic::cli;

fn main() -> Result<()> {
    // Parse first so the verbose flag can pick the log level
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("OpenAPI from traffic starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    Ok(())
}
