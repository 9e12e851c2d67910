use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("required config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read config resource '{location}': {source}")]
    ReadError {
        location: String,
        source: std::io::Error,
    },

    #[error("config resource '{uri}' is not valid UTF-8: {source}")]
    InvalidUtf8 {
        uri: String,
        source: std::string::FromUtf8Error,
    },

    #[error("cannot start evaluator '{program}': {reason}")]
    EvaluatorUnavailable { program: PathBuf, reason: String },

    #[error("failed to evaluate '{uri}': {message}")]
    Evaluation { uri: String, message: String },

    #[error("failed to decode evaluator output for '{uri}': {source}")]
    Decode {
        uri: String,
        source: rmp_serde::decode::Error,
    },

    #[error("'{uri}' did not evaluate to an object")]
    NotAModule { uri: String },

    #[error("failed to parse config file '{location}': {source}")]
    ParseError {
        location: String,
        source: toml::de::Error,
    },

    #[error("no property source loader for '{0}'")]
    UnsupportedExtension(String),

    #[error("required property not found: {0}")]
    MissingProperty(String),

    #[error("cannot convert property '{path}' to {target}: {reason}")]
    Conversion {
        path: String,
        target: &'static str,
        reason: String,
    },

    #[error("circular reference detected in configuration")]
    CircularReference,

    #[error("referenced path not found: {0}")]
    ReferenceNotFound(String),

    #[error("invalid reference path: {0}")]
    InvalidReferencePath(String),

    #[error("cannot reference non-scalar value: {0}")]
    NonScalarReference(String),

    #[error("unclosed reference (missing '}}')")]
    UnclosedReference,
}
