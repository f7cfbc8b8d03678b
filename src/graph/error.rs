//! Structural errors found while building the holding graph.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("duplicate institution '{0}'")]
    DuplicateInstitution(String),
    #[error("duplicate account '{account}' in institution '{institution}'")]
    DuplicateAccount { institution: String, account: String },
    #[error("duplicate holding '{holding}' in account '{account}'")]
    DuplicateHolding { account: String, holding: String },
    #[error("malformed value for '{holding}': {message}")]
    MalformedExpression { holding: String, message: String },
    #[error("invalid structure at '{path}': {message}")]
    InvalidStructure { path: String, message: String },
}

/// Every structural error of one build, in discovery order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} structural error(s): {}", .0.len(), join(.0))]
pub struct BuildErrors(pub Vec<BuildError>);

fn join(errors: &[BuildError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}
