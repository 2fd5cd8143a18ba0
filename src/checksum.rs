//! Content fingerprints, used to tell whether an upgrade changed a file

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::decode::split_documents;

/// SHA-256 of a config file's text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum(String);

impl Checksum {
    pub fn of(content: &str) -> Self {
        Self(format!("{:x}", Sha256::digest(content.as_bytes())))
    }

    /// Fingerprint of the documents in a YAML stream, ignoring formatting
    /// and comments. A stream that does not parse is fingerprinted as its
    /// raw text.
    pub fn of_documents(text: &str) -> Self {
        let Ok(documents) = split_documents(text) else {
            return Self::of(text);
        };
        let values: Vec<&serde_yaml::Value> = documents.iter().map(|d| &d.value).collect();
        match serde_yaml::to_string(&values) {
            Ok(canonical) => Self::of(&canonical),
            Err(_) => Self::of(text),
        }
    }

    /// First twelve hex digits, for display
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self.0)
    }
}
