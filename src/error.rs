//! Error types for schema normalization

use thiserror::Error;

use crate::visitor::NodeKind;

/// Result type for normalization operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema normalization errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Invalid schema format: {0}")]
    InvalidFormat(String),

    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Key '{key}' is not allowed on a '{kind}' property")]
    UnknownKey { key: String, kind: String },

    #[error("Gotta have a name: {0}")]
    MissingName(String),

    #[error("Could not resolve $ref '{reference}' in namespace {namespace}")]
    UnresolvedReference { reference: String, namespace: String },

    #[error("Could not find type: {0}")]
    MissingType(String),

    #[error("Missing namespace: {0}")]
    MissingNamespace(String),

    #[error("Namespace already exists: {namespace} in file: {file}")]
    DuplicateNamespace { namespace: String, file: String },

    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error("Patch '{path}': {message}")]
    Patch { path: String, message: String },

    #[error("error processing '{file}' in fix '{pass}' ({kind}): {source}")]
    Pass {
        file: String,
        pass: String,
        kind: NodeKind,
        #[source]
        source: Box<SchemaError>,
    },

    #[error("Failed to parse {file} at {path}: {message}")]
    Parse {
        file: String,
        path: String,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SchemaError {
    /// Attach the (file, fix, node kind) context of a traversal boundary
    pub fn in_pass(file: &str, pass: &str, kind: NodeKind, source: SchemaError) -> Self {
        SchemaError::Pass {
            file: file.to_string(),
            pass: pass.to_string(),
            kind,
            source: Box::new(source),
        }
    }

    pub fn patch(path: &str, message: impl Into<String>) -> Self {
        SchemaError::Patch {
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// The innermost error, skipping any pass context wrappers
    pub fn root_cause(&self) -> &SchemaError {
        match self {
            SchemaError::Pass { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
