//! CLI module for tenantdb
//!
//! Provides command-line interface for:
//! - serve: Start the HTTP server
//! - validate-schema: Check a field array offline
//! - validate-document: Check a document against a field array offline
//! - normalize-query: Show how raw query parameters are normalized

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    normalize_query, run, run_command, serve, validate_document, validate_schema,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{error_body, read_json_file, success_body, write_error, write_response};
