//! CLI command implementations
//!
//! Validation commands print one JSON object to stdout. A rejected input is
//! printed as an error object carrying the engine's error code, and the
//! command then fails so the process exits non-zero.

use std::collections::HashMap;
use std::path::Path;

use serde_json::{json, Value};

use crate::config::EngineConfig;
use crate::http_server::HttpServer;
use crate::observability::{log_event_with_fields, Event};
use crate::query::QueryOptions;
use crate::schema::{validate_schema_definition, CollectionField, DocumentValidator};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_json_file, write_error, write_response};

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Serve { config, port } => serve(config.as_deref(), port),
        Command::ValidateSchema { file } => validate_schema(&file),
        Command::ValidateDocument { schema, file } => validate_document(&schema, &file),
        Command::NormalizeQuery { params } => normalize_query(&params),
    }
}

/// Load configuration and run the HTTP server until it stops
pub fn serve(config_path: Option<&Path>, port: Option<u16>) -> CliResult<()> {
    let mut config = match config_path {
        Some(path) => {
            let config = EngineConfig::load(path)?;
            log_event_with_fields(
                Event::ConfigLoaded,
                &[("path", path.display().to_string().as_str())],
            );
            config
        }
        None => EngineConfig::default(),
    };
    if let Some(port) = port {
        config.port = port;
    }

    let server = HttpServer::from_config(config)
        .map_err(|e| CliError::boot_failed(format!("Failed to open changelog: {}", e)))?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        server
            .start()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)))
    })
}

/// Validate a schema definition file
pub fn validate_schema(path: &Path) -> CliResult<()> {
    let definition = read_json_file(path)?;
    respond(check_schema(&definition).map(|fields| {
        json!({
            "valid": true,
            "fields": fields,
        })
    }))
}

/// Validate a document file against a schema definition file
pub fn validate_document(schema_path: &Path, document_path: &Path) -> CliResult<()> {
    let definition = read_json_file(schema_path)?;
    let document = read_json_file(document_path)?;
    respond(check_document(&definition, &document))
}

/// Print normalized query options for `key=value` parameters
pub fn normalize_query(params: &[String]) -> CliResult<()> {
    let params = parse_params(params)?;
    write_response(serde_json::to_value(QueryOptions::normalize(&params))?)
}

/// A rejected input: engine error code and message
#[derive(Debug, PartialEq)]
struct Rejection {
    code: &'static str,
    message: String,
}

fn respond(outcome: Result<Value, Rejection>) -> CliResult<()> {
    match outcome {
        Ok(data) => write_response(data),
        Err(rejection) => {
            write_error(rejection.code, &rejection.message)?;
            Err(CliError::validation_failed(rejection.message))
        }
    }
}

/// Accepts a bare field array or an object carrying one under `fields`
fn definition_fields(definition: &Value) -> &Value {
    match definition {
        Value::Object(obj) => obj.get("fields").unwrap_or(definition),
        _ => definition,
    }
}

fn check_schema(definition: &Value) -> Result<Vec<CollectionField>, Rejection> {
    validate_schema_definition(definition_fields(definition)).map_err(|e| Rejection {
        code: e.code(),
        message: e.to_string(),
    })
}

fn check_document(definition: &Value, document: &Value) -> Result<Value, Rejection> {
    let fields = check_schema(definition)?;
    DocumentValidator::default()
        .validate(document, &fields)
        .map_err(|e| Rejection {
            code: e.code(),
            message: e.to_string(),
        })?;
    Ok(json!({ "valid": true }))
}

/// Splits each argument at its first `=`
fn parse_params(params: &[String]) -> CliResult<HashMap<String, String>> {
    params
        .iter()
        .map(|param| {
            param
                .split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| {
                    CliError::usage_error(format!("expected key=value, got '{}'", param))
                })
        })
        .collect()
}
