//! Error types for parsing and upgrading configuration documents

use thiserror::Error;

use crate::registry::Lineage;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema engine errors
///
/// None of these are retried internally: each one describes a permanently
/// malformed input or an impossible request.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("parsing document {document}: {message}")]
    Malformed { document: usize, message: String },

    #[error("document {document} has no apiVersion")]
    MissingVersion { document: usize },

    #[error("unknown apiVersion {version:?}{}", suggestion_suffix(.suggestion))]
    UnknownVersion {
        version: String,
        suggestion: Option<String>,
    },

    #[error("decoding {version} document: {message}")]
    Decode { version: String, message: String },

    #[error("upgrading from {from} to {to}: {reason}")]
    Upgrade {
        from: String,
        to: String,
        reason: String,
    },

    #[error("{version} is the terminal version of its lineage and cannot be upgraded")]
    TerminalVersion { version: String },

    #[error("detected incompatible versions: {older:?} are incompatible with {newer:?}")]
    IncompatibleVersions {
        older: Vec<String>,
        newer: Vec<String>,
    },

    #[error("the following versions are incompatible with target version {target}: {versions:?}{}. upgrade aborted", newer_suffix(.newer))]
    IncompatibleWithTarget {
        target: String,
        versions: Vec<String>,
        newer: Vec<String>,
    },

    #[error("config version {} is more recent than target version {target:?}: upgrade skaffold", quoted(.versions))]
    Downgrade {
        versions: Vec<String>,
        target: String,
    },

    #[error("version {0} is registered more than once")]
    DuplicateVersion(String),

    #[error("lineage {0} has no registered versions")]
    EmptyLineage(Lineage),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SchemaError {
    /// A one-line remedy suitable for printing under the error message
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            SchemaError::Malformed { .. } | SchemaError::Decode { .. } => {
                Some("fix the configuration file so it matches the schema of its apiVersion")
            }
            SchemaError::MissingVersion { .. } => {
                Some("add an apiVersion field, e.g. `apiVersion: skaffold/v4beta1`")
            }
            SchemaError::UnknownVersion { .. } | SchemaError::Downgrade { .. } => {
                Some("upgrade skaffold, or fix the apiVersion field")
            }
            SchemaError::IncompatibleVersions { .. }
            | SchemaError::IncompatibleWithTarget { .. } => {
                Some("keep every document of a file within the same schema generation")
            }
            _ => None,
        }
    }
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean {s:?}?)"),
        None => String::new(),
    }
}

fn newer_suffix(newer: &[String]) -> String {
    if newer.is_empty() {
        String::new()
    } else {
        format!("; {newer:?} cannot be downgraded")
    }
}

fn quoted(versions: &[String]) -> String {
    versions
        .iter()
        .map(|v| format!("{v:?}"))
        .collect::<Vec<_>>()
        .join(", ")
}
