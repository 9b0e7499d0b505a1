//! JSON I/O handling for CLI
//!
//! - Input: JSON files named on the command line
//! - Output: one JSON object per command on stdout

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde_json::{json, Value};

use super::errors::{CliError, CliResult};

/// Read and parse a JSON file
pub fn read_json_file(path: &Path) -> CliResult<Value> {
    let content = fs::read_to_string(path)
        .map_err(|e| CliError::io_error(format!("Failed to read {}: {}", path.display(), e)))?;
    Ok(serde_json::from_str(&content)?)
}

/// `{"status":"ok","data":...}`
pub fn success_body(data: Value) -> Value {
    json!({
        "status": "ok",
        "data": data
    })
}

/// `{"status":"error","code":...,"message":...}`
pub fn error_body(code: &str, message: &str) -> Value {
    json!({
        "status": "error",
        "code": code,
        "message": message
    })
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_line(&success_body(data))
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    write_line(&error_body(code, message))
}

fn write_line(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    #[test]
    fn test_bodies() {
        assert_eq!(success_body(json!(1))["status"], "ok");
        let err = error_body("SCHEMA_DUPLICATE_FIELD", "Duplicate field name: a");
        assert_eq!(err["status"], "error");
        assert_eq!(err["code"], "SCHEMA_DUPLICATE_FIELD");
    }

    #[test]
    fn test_read_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"[{{"name": "a", "type": "string"}}]"#).unwrap();
        let value = read_json_file(file.path()).unwrap();
        assert_eq!(value[0]["name"], "a");
    }

    #[test]
    fn test_read_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(read_json_file(file.path()).is_err());
    }
}
