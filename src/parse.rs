//! Front end
//!
//! File-level entry points: detect, parse, parse and fully upgrade, and
//! serialize a batch back to text.

use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use crate::compatibility::resolve_common_version;
use crate::decode::decode_all;
use crate::detect::is_config_text;
use crate::error::Result;
use crate::registry::SchemaRegistry;
use crate::upgrade::run_chain;
use crate::versioned::VersionedConfig;

/// Path that stands for standard input
pub const STDIN: &str = "-";

/// Read a config file, or standard input when `path` is `-`
pub fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == STDIN {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        return Ok(text);
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Whether a file holds configuration documents. Unreadable files are not.
pub fn is_skaffold_config(registry: &SchemaRegistry, path: &Path) -> bool {
    match read_input(path) {
        Ok(text) => is_config_text(registry, &text),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "could not read file");
            false
        }
    }
}

/// Decode every document of a file at its declared version, without
/// upgrading
pub fn parse_config(
    registry: &SchemaRegistry,
    path: &Path,
) -> Result<Vec<Box<dyn VersionedConfig>>> {
    let text = read_input(path)?;
    let batch = decode_all(registry, &text)?;
    info!(path = %path.display(), documents = batch.len(), "parsed config");
    Ok(batch)
}

/// Decode every document of a file and upgrade each to the terminal
/// version of the batch's lineage
pub fn parse_config_and_upgrade(
    registry: &SchemaRegistry,
    path: &Path,
) -> Result<Vec<Box<dyn VersionedConfig>>> {
    let text = read_input(path)?;
    let batch = parse_and_upgrade_str(registry, &text)?;
    info!(path = %path.display(), documents = batch.len(), "parsed and upgraded config");
    Ok(batch)
}

/// [`parse_config_and_upgrade`] over text already in memory
pub fn parse_and_upgrade_str(
    registry: &SchemaRegistry,
    text: &str,
) -> Result<Vec<Box<dyn VersionedConfig>>> {
    let batch = decode_all(registry, text)?;
    if batch.is_empty() {
        return Ok(batch);
    }

    let target = resolve_common_version(registry, &batch)?;
    debug!(target, "resolved common version");
    batch
        .into_iter()
        .map(|config| run_chain(registry, config))
        .collect()
}

/// Serialize a batch as YAML documents separated by `---`
pub fn marshal(batch: &[Box<dyn VersionedConfig>]) -> Result<String> {
    let documents = batch
        .iter()
        .map(|config| config.to_yaml())
        .collect::<Result<Vec<_>>>()?;
    Ok(documents.join("---\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::{v2beta29, v4beta1};

    #[test]
    fn test_empty_text_is_empty_batch() {
        let registry = SchemaRegistry::builtin();
        assert!(parse_and_upgrade_str(&registry, "").unwrap().is_empty());
        assert_eq!(marshal(&[]).unwrap(), "");
    }

    #[test]
    fn test_lineages_end_at_their_own_terminal() {
        let registry = SchemaRegistry::builtin();
        let text = "apiVersion: skaffold/v1alpha1\nkind: Config\n";
        let batch = parse_and_upgrade_str(&registry, text).unwrap();
        assert_eq!(batch[0].version(), v2beta29::VERSION);

        let text = "apiVersion: skaffold/v3alpha1\nkind: Config\n";
        let batch = parse_and_upgrade_str(&registry, text).unwrap();
        assert_eq!(batch[0].version(), v4beta1::VERSION);
    }

    #[test]
    fn test_marshal_separates_documents() {
        let registry = SchemaRegistry::builtin();
        let text = "apiVersion: skaffold/v4beta1\nkind: Config\n---\napiVersion: skaffold/v3\nkind: Config\n";
        let batch = parse_and_upgrade_str(&registry, text).unwrap();
        let out = marshal(&batch).unwrap();
        assert_eq!(out.matches("---\n").count(), 1);
        assert_eq!(out.matches("apiVersion: skaffold/v4beta1").count(), 2);
    }
}
