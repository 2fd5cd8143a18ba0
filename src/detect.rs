//! Format Detector
//!
//! Decides whether text looks like one of our configuration documents by
//! reading only the `apiVersion`/`kind` envelope. Nothing here fails loudly:
//! a negative answer just means the file is not ours to handle.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_yaml::Value;
use tracing::trace;

use crate::decode::split_documents;
use crate::registry::SchemaRegistry;
use crate::schemas::KIND;

static VERSION_SYNTAX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^skaffold/v\d+((alpha|beta)\d+)?$").unwrap());

/// The two fields every document must carry, regardless of version
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "apiVersion", default)]
    api_version: Option<String>,
    #[serde(default)]
    kind: Option<String>,
}

/// Whether `version` is shaped like a schema identifier, registered or not
pub fn is_version_identifier(version: &str) -> bool {
    VERSION_SYNTAX.is_match(version)
}

/// Whether a single document declares `kind: Config` and a registered
/// `apiVersion`
pub fn is_config_document(registry: &SchemaRegistry, text: &str) -> bool {
    match serde_yaml::from_str(text) {
        Ok(value) => is_config_value(registry, value),
        Err(e) => {
            trace!(error = %e, "not a YAML document");
            false
        }
    }
}

fn is_config_value(registry: &SchemaRegistry, value: Value) -> bool {
    let envelope: Envelope = match serde_yaml::from_value(value) {
        Ok(envelope) => envelope,
        Err(e) => {
            trace!(error = %e, "not a configuration envelope");
            return false;
        }
    };

    let (Some(version), Some(kind)) = (envelope.api_version, envelope.kind) else {
        return false;
    };
    kind == KIND && is_version_identifier(&version) && registry.find(&version).is_some()
}

/// Whether every document of a file is a configuration document.
///
/// A file with no documents at all is not considered one of ours.
pub fn is_config_text(registry: &SchemaRegistry, text: &str) -> bool {
    let documents = match split_documents(text) {
        Ok(documents) => documents,
        Err(e) => {
            trace!(error = %e, "not a YAML stream");
            return false;
        }
    };
    !documents.is_empty()
        && documents
            .into_iter()
            .all(|document| is_config_value(registry, document.value))
}
