//! Interfaces of the collaborators around the core.
//!
//! Implementations live outside this crate, except for [`JsonTreeParser`].

use crate::report::ReportModel;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("decryption failed: {0}")]
pub struct DecryptionError(pub String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("secret '{0}' not found")]
pub struct SecretNotFound(pub String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("parse error at line {line}, column {column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Every violation found, not just the first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("schema violations: {}", .violations.join("; "))]
pub struct SchemaError {
    pub violations: Vec<String>,
}

pub trait Decryptor {
    fn decrypt(&self, ciphertext: &[u8], passphrase: &str) -> Result<String, DecryptionError>;
}

pub trait SecretStore {
    fn get_secret(&self, name: &str) -> Result<String, SecretNotFound>;
}

pub trait TreeParser {
    fn parse(&self, text: &str) -> Result<Value, ParseError>;
}

pub trait SchemaValidator {
    fn validate(&self, tree: Value) -> Result<Value, SchemaError>;
}

pub trait Renderer {
    fn render(&self, report: &ReportModel) -> String;
}

/// Parses JSON documents, keeping mapping order.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTreeParser;

impl TreeParser for JsonTreeParser {
    fn parse(&self, text: &str) -> Result<Value, ParseError> {
        serde_json::from_str(text).map_err(|e| ParseError {
            line: e.line(),
            column: e.column(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_parser_reports_position() {
        let err = JsonTreeParser.parse("{\n  \"institutions\": [,]\n}").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.column > 0);

        let tree = JsonTreeParser.parse(r#"{ "b": 1, "a": 2 }"#).unwrap();
        let keys: Vec<&String> = tree.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["b", "a"]);
    }
}
