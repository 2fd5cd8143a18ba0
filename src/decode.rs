//! Document Decoder
//!
//! Splits a YAML stream into its documents and decodes each one
//! into the shape registered for the `apiVersion` it declares.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::registry::SchemaRegistry;
use crate::schemas::KIND;
use crate::versioned::VersionedConfig;

/// One document of a YAML stream, with its 0-based position in the stream
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub index: usize,
    pub value: Value,
}

/// Split a YAML stream into its documents, in file order.
///
/// Documents holding nothing but whitespace and comments are dropped, so an
/// empty file yields no documents. A syntax error anywhere is reported as
/// malformed input at the position of the document it occurs in.
pub fn split_documents(text: &str) -> Result<Vec<RawDocument>> {
    let mut documents = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_str(text).enumerate() {
        let value = Value::deserialize(document).map_err(|e| SchemaError::Malformed {
            document: index,
            message: e.to_string(),
        })?;
        if !matches!(value, Value::Null) {
            documents.push(RawDocument { index, value });
        }
    }
    Ok(documents)
}

/// Decode one document's text. `document` is its 0-based position in the
/// file and only used for error reporting.
pub fn decode_document(
    registry: &SchemaRegistry,
    document: usize,
    text: &str,
) -> Result<Box<dyn VersionedConfig>> {
    let value: Value = serde_yaml::from_str(text).map_err(|e| SchemaError::Malformed {
        document,
        message: e.to_string(),
    })?;
    decode_value(registry, document, value)
}

/// Decode one already-parsed document.
///
/// A document without `kind` is accepted; one declaring any other kind than
/// `Config` is malformed.
pub fn decode_value(
    registry: &SchemaRegistry,
    document: usize,
    value: Value,
) -> Result<Box<dyn VersionedConfig>> {
    let Value::Mapping(mapping) = value else {
        return Err(SchemaError::Malformed {
            document,
            message: "expected a mapping at the top level".to_string(),
        });
    };

    let version = match mapping.get("apiVersion") {
        None | Some(Value::Null) => return Err(SchemaError::MissingVersion { document }),
        Some(Value::String(version)) if version.is_empty() => {
            return Err(SchemaError::MissingVersion { document })
        }
        Some(Value::String(version)) => version.clone(),
        Some(_) => {
            return Err(SchemaError::Malformed {
                document,
                message: "apiVersion must be a string".to_string(),
            })
        }
    };

    match mapping.get("kind") {
        None | Some(Value::Null) => {}
        Some(Value::String(kind)) if kind == KIND => {}
        Some(other) => {
            return Err(SchemaError::Malformed {
                document,
                message: format!("kind must be {KIND:?}, found {other:?}"),
            })
        }
    }

    let entry = registry
        .find(&version)
        .ok_or_else(|| registry.unknown(&version))?;

    // Dotted top-level keys only exist to hold YAML anchors
    let mapping: Mapping = mapping
        .into_iter()
        .filter(|(key, _)| !matches!(key, Value::String(k) if k.starts_with('.')))
        .collect();

    let config = (entry.decoder)(Value::Mapping(mapping)).map_err(|e| SchemaError::Decode {
        version: version.clone(),
        message: e.to_string(),
    })?;
    config.validate()?;

    debug!(document, version = %version, "decoded document");
    Ok(config)
}

/// Decode every document of a file, failing on the first bad one
pub fn decode_all(registry: &SchemaRegistry, text: &str) -> Result<Vec<Box<dyn VersionedConfig>>> {
    split_documents(text)?
        .into_iter()
        .map(|raw| decode_value(registry, raw.index, raw.value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::{v1beta6, v2beta29, v4beta1};

    fn values(text: &str) -> Vec<Value> {
        split_documents(text)
            .unwrap()
            .into_iter()
            .map(|raw| raw.value)
            .collect()
    }

    fn parsed(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_split_documents() {
        let text = "a: 1\n---\nb: 2\n--- # trailing comment\n# only a comment\n---\n\n---\nc: 3";
        assert_eq!(values(text), vec![parsed("a: 1"), parsed("b: 2"), parsed("c: 3")]);

        let indices: Vec<usize> = split_documents(text).unwrap().iter().map(|d| d.index).collect();
        assert_eq!(indices, vec![0, 1, 4]);

        assert!(values("").is_empty());
        assert!(values("\n\n# nothing\n").is_empty());
    }

    #[test]
    fn test_separator_inside_block_scalar() {
        let text = "script: |\n  a\n  ---\n  b\n";
        let documents = values(text);
        assert_eq!(documents.len(), 1);
        assert_eq!(documents[0]["script"], Value::String("a\n---\nb\n".to_string()));
    }

    #[test]
    fn test_block_scalar_with_separator_decodes() {
        let registry = SchemaRegistry::builtin();
        let text = "\
apiVersion: skaffold/v2beta29
kind: Config
build:
  tagPolicy:
    envTemplate:
      template: |
        a
        ---
        b
";
        let batch = decode_all(&registry, text).unwrap();
        assert_eq!(batch.len(), 1);
        let config = batch[0].downcast_ref::<v2beta29::SkaffoldConfig>().unwrap();
        let template = &config.build.tag_policy.env_template.as_ref().unwrap().template;
        assert_eq!(template, "a\n---\nb\n");
    }

    #[test]
    fn test_syntax_error_reports_document_position() {
        let registry = SchemaRegistry::builtin();
        let text = "apiVersion: skaffold/v4beta1\nkind: Config\n---\nkey: [unclosed\n";
        let err = decode_all(&registry, text).unwrap_err();
        assert!(matches!(err, SchemaError::Malformed { document: 1, .. }), "{err}");
    }

    #[test]
    fn test_wrong_kind_is_malformed() {
        let registry = SchemaRegistry::builtin();
        let err = decode_document(&registry, 0, "apiVersion: skaffold/v4beta1\nkind: Deployment\n")
            .unwrap_err();
        assert!(matches!(err, SchemaError::Malformed { document: 0, .. }), "{err}");

        // kind may be left out
        let config = decode_document(&registry, 0, "apiVersion: skaffold/v4beta1\n").unwrap();
        assert_eq!(config.version(), v4beta1::VERSION);
    }

    #[test]
    fn test_decode_at_declared_version() {
        let registry = SchemaRegistry::builtin();
        let text = "apiVersion: skaffold/v1beta6\nkind: Config\ndeploy:\n  kustomize: {}\n";
        let config = decode_document(&registry, 0, text).unwrap();
        assert_eq!(config.version(), v1beta6::VERSION);

        let config = config.downcast::<v1beta6::SkaffoldConfig>().unwrap();
        assert!(config.deploy.kustomize.is_some());
    }

    #[test]
    fn test_missing_version() {
        let registry = SchemaRegistry::builtin();
        for text in ["kind: Config\n", "apiVersion:\nkind: Config\n", "apiVersion: \"\"\n"] {
            let err = decode_document(&registry, 2, text).unwrap_err();
            assert!(
                matches!(err, SchemaError::MissingVersion { document: 2 }),
                "{text:?} gave {err}"
            );
        }
    }

    #[test]
    fn test_unknown_version() {
        let registry = SchemaRegistry::builtin();
        let err = decode_document(&registry, 0, "apiVersion: skaffold/v9\nkind: Config\n")
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownVersion { ref version, .. } if version == "skaffold/v9"));
    }

    #[test]
    fn test_malformed() {
        let registry = SchemaRegistry::builtin();
        let err = decode_document(&registry, 0, "bad config").unwrap_err();
        assert!(matches!(err, SchemaError::Malformed { document: 0, .. }));

        let err = decode_document(&registry, 1, "apiVersion: [1]\n").unwrap_err();
        assert!(matches!(err, SchemaError::Malformed { document: 1, .. }));
    }

    #[test]
    fn test_strict_fields() {
        let registry = SchemaRegistry::builtin();
        let text = "apiVersion: skaffold/v4beta1\nkind: Config\nbuild:\n  notAField: true\n";
        let err = decode_document(&registry, 0, text).unwrap_err();
        assert!(matches!(err, SchemaError::Decode { ref version, .. } if version == v4beta1::VERSION));
    }

    #[test]
    fn test_dotted_keys_are_ignored() {
        let registry = SchemaRegistry::builtin();
        let text = "\
apiVersion: skaffold/v4beta1
kind: Config
.images: &image
  image: app
build:
  artifacts:
  - *image
";
        let config = decode_document(&registry, 0, text)
            .unwrap()
            .downcast::<v4beta1::SkaffoldConfig>()
            .unwrap();
        assert_eq!(config.build.artifacts[0].image, "app");
    }
}
