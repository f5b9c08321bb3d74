//! Command-line interface for the question-answering service.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Retrieval-augmented question answering over uploaded documents.
#[derive(Debug, Parser)]
#[command(name = "ragqa")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(long, short = 'f', global = true, default_value_t = OutputFormat::Text, help = "Output format: text or json")]
    pub format: OutputFormat,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP API (upload, query, health)
    Serve(commands::ServeArgs),

    /// Ingest a file or directory into the index
    Ingest(commands::IngestArgs),

    /// Answer a question from the index
    Query(commands::QueryArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        let cli = Cli::parse_from(["ragqa", "--format", "json", "query", "What color?", "-s"]);
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Query(args) => {
                assert_eq!(args.question, "What color?");
                assert!(args.sources);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_serve_defaults() {
        let cli = Cli::parse_from(["ragqa", "serve", "--port", "9000"]);
        assert_eq!(cli.format, OutputFormat::Text);
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.port, Some(9000));
                assert!(args.host.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
