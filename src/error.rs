use cedar_policy::ParseErrors;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum MapperError {
    #[error("failed to parse input: {0}")]
    ParseError(String),

    #[error("role has no action mapping: {0}")]
    UnknownRole(String),

    #[error("action has no role mapping: {0}")]
    UnmappedAction(String),

    #[error("unsupported node type: {0}")]
    UnsupportedNodeType(String),

    #[error("mapping ambiguity: {0}")]
    MappingAmbiguity(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl From<serde_json::Error> for MapperError {
    fn from(err: serde_json::Error) -> Self {
        MapperError::ParseError(err.to_string())
    }
}

impl From<std::io::Error> for MapperError {
    fn from(err: std::io::Error) -> Self {
        MapperError::IoError(err.to_string())
    }
}

impl From<ParseErrors> for MapperError {
    fn from(err: ParseErrors) -> Self {
        MapperError::ParseError(err.to_string())
    }
}
