//! CLI argument definitions using clap
//!
//! Commands:
//! - tenantdb serve [--config <path>] [--port <port>]
//! - tenantdb validate-schema <file>
//! - tenantdb validate-document --schema <file> <file>
//! - tenantdb normalize-query [key=value...]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tenantdb - multi-tenant collection schema and document validation engine
#[derive(Parser, Debug)]
#[command(name = "tenantdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Path to configuration file; built-in defaults when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Validate a field array (or a collection request with `fields`)
    ValidateSchema {
        /// JSON file holding the definition
        file: PathBuf,
    },

    /// Validate a document against a schema definition
    ValidateDocument {
        /// JSON file holding the field array
        #[arg(long)]
        schema: PathBuf,

        /// JSON file holding the document
        file: PathBuf,
    },

    /// Print the normalized form of raw query parameters
    NormalizeQuery {
        /// Parameters as key=value pairs
        params: Vec<String>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_validate_document() {
        let cli = Cli::try_parse_from([
            "tenantdb",
            "validate-document",
            "--schema",
            "users.json",
            "doc.json",
        ])
        .unwrap();

        match cli.command {
            Command::ValidateDocument { schema, file } => {
                assert_eq!(schema, PathBuf::from("users.json"));
                assert_eq!(file, PathBuf::from("doc.json"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_normalize_query() {
        let cli =
            Cli::try_parse_from(["tenantdb", "normalize-query", "page=2", "status=open"]).unwrap();
        match cli.command {
            Command::NormalizeQuery { params } => assert_eq!(params.len(), 2),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_serve_config_is_optional() {
        let cli = Cli::try_parse_from(["tenantdb", "serve", "--port", "9000"]).unwrap();
        match cli.command {
            Command::Serve { config, port } => {
                assert!(config.is_none());
                assert_eq!(port, Some(9000));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
