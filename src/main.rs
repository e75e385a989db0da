//! # Modekit - Editing Modes From the Command Line
//!
//! Loads mode catalogs, resolves which mode a file belongs to, and runs
//! that mode's tokenizer.
//!
//! ## Quick Start
//!
//! ```bash
//! # Which mode does a file get?
//! cargo run -- --catalog modes/ detect src/main.rs
//!
//! # Every mode the catalogs define
//! cargo run -- --catalog modes/ list --json
//!
//! # Tokens of a file, line by line
//! cargo run -- --catalog modes/ tokenize src/main.rs
//!
//! # Reload whenever a catalog changes
//! cargo run -- --catalog modes/ watch
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use anyhow::Context;
use modekit_core::Config;

use crate::commands::Session;

/// Modekit - resolve editing modes for files
#[derive(Parser, Debug)]
#[command(name = "modekit")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file to use instead of the default one
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Extra catalog directory, loaded after the configured ones
    #[arg(long = "catalog", value_name = "DIR")]
    catalogs: Vec<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Print the mode a file resolves to
    Detect {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// First line to match against instead of reading the file
        #[arg(long, value_name = "TEXT")]
        first_line: Option<String>,
    },

    /// List the loaded modes
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Print the tokens of a file
    Tokenize {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Mode to use instead of detecting one
        #[arg(short, long, value_name = "NAME")]
        mode: Option<String>,
    },

    /// Reload the catalogs whenever one changes
    Watch,

    /// Print the effective configuration
    Config {
        /// Write it to the default config file instead
        #[arg(long)]
        save: bool,
    },
}

fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Cannot load config {}", path.display()))?,
        None => Config::load(),
    };

    // Initialize logging
    let log_level = match args.verbose {
        0 => config.logging.tracing_level(),
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    tracing::info!("Starting Modekit v{}", env!("CARGO_PKG_VERSION"));

    let command = args.command.unwrap_or(if config.catalogs.watch {
        Command::Watch
    } else {
        Command::List { json: false }
    });

    let session = Session::open(config, &args.catalogs);
    let mut stdout = std::io::stdout().lock();

    match command {
        Command::Detect { file, first_line } => {
            commands::detect(&session, &file, first_line.as_deref(), &mut stdout)
        }
        Command::List { json } => commands::list(&session, json, &mut stdout),
        Command::Tokenize { file, mode } => {
            commands::tokenize(&session, &file, mode.as_deref(), &mut stdout)
        }
        Command::Watch => {
            drop(stdout);
            let runtime = tokio::runtime::Runtime::new().context("Cannot start async runtime")?;
            runtime.block_on(commands::watch(&session))
        }
        Command::Config { save } => commands::show_config(&session.config, save, &mut stdout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_detect_with_globals() {
        let args = Args::try_parse_from([
            "modekit", "--catalog", "/a", "--catalog", "/b", "detect", "x.rs", "--first-line", "#!/bin/sh", "-vv",
        ])
        .unwrap();

        assert_eq!(args.catalogs, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
        assert_eq!(args.verbose, 2);
        assert_eq!(
            args.command,
            Some(Command::Detect {
                file: PathBuf::from("x.rs"),
                first_line: Some("#!/bin/sh".to_string()),
            })
        );
    }

    #[test]
    fn test_catalog_after_subcommand_is_rejected() {
        let result = Args::try_parse_from(["modekit", "--catalog", "/a", "list", "--catalog", "/b"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_list_and_tokenize() {
        let args = Args::try_parse_from(["modekit", "list", "--json"]).unwrap();
        assert_eq!(args.command, Some(Command::List { json: true }));

        let args = Args::try_parse_from(["modekit", "tokenize", "f.c", "--mode", "c"]).unwrap();
        assert_eq!(
            args.command,
            Some(Command::Tokenize {
                file: PathBuf::from("f.c"),
                mode: Some("c".to_string()),
            })
        );
    }

    #[test]
    fn test_parse_config() {
        let args = Args::try_parse_from(["modekit", "config", "--save"]).unwrap();
        assert_eq!(args.command, Some(Command::Config { save: true }));
    }

    #[test]
    fn test_command_is_optional() {
        let args = Args::try_parse_from(["modekit", "-c", "/etc/modekit.toml"]).unwrap();
        assert!(args.command.is_none());
        assert_eq!(args.config, Some(PathBuf::from("/etc/modekit.toml")));
    }
}
