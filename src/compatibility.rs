//! Compatibility Resolver
//!
//! Works out whether the documents of one file can be upgraded together,
//! either to whatever is newest in their lineage or to an explicit target.

use serde::Serialize;
use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::registry::{Lineage, SchemaRegistry};
use crate::versioned::VersionedConfig;

/// Outcome of checking a batch against an explicit target version
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityReport {
    pub target: String,
    pub lineage: Lineage,
    /// Versions belonging to the other lineage
    pub lineage_mismatch: Vec<String>,
    /// Versions of the target's lineage that are already past it
    pub too_new: Vec<String>,
}

impl CompatibilityReport {
    pub fn is_compatible(&self) -> bool {
        self.lineage_mismatch.is_empty() && self.too_new.is_empty()
    }

    /// Turn an incompatible report into the matching error
    pub fn into_result(self) -> Result<()> {
        if !self.lineage_mismatch.is_empty() {
            return Err(SchemaError::IncompatibleWithTarget {
                target: self.target,
                versions: self.lineage_mismatch,
                newer: self.too_new,
            });
        }
        if !self.too_new.is_empty() {
            return Err(SchemaError::Downgrade {
                versions: self.too_new,
                target: self.target,
            });
        }
        Ok(())
    }
}

fn push_unique(versions: &mut Vec<String>, version: &str) {
    if !versions.iter().any(|v| v == version) {
        versions.push(version.to_string());
    }
}

/// The version every document of the batch should be upgraded to.
///
/// That is the terminal version of the one lineage the batch belongs to,
/// even when no document is at it yet. An empty batch resolves to the
/// newest schema.
pub fn resolve_common_version(
    registry: &SchemaRegistry,
    batch: &[Box<dyn VersionedConfig>],
) -> Result<&'static str> {
    let mut groups: [Vec<String>; 2] = Default::default();
    for config in batch {
        let version = config.version();
        let lineage = registry
            .lineage_of(version)
            .ok_or_else(|| registry.unknown(version))?;
        let group = match lineage {
            Lineage::V1 => &mut groups[0],
            Lineage::V2 => &mut groups[1],
        };
        push_unique(group, version);
    }

    let [older, newer] = groups;
    match (older.is_empty(), newer.is_empty()) {
        (false, false) => Err(SchemaError::IncompatibleVersions { older, newer }),
        (false, true) => Ok(registry.terminal_of(Lineage::V1)),
        (true, false) => Ok(registry.terminal_of(Lineage::V2)),
        (true, true) => Ok(registry.latest()),
    }
}

/// Classify every document of the batch against `target`.
///
/// Fails only when `target` or a document's version is not registered.
pub fn check_compatibility(
    registry: &SchemaRegistry,
    batch: &[Box<dyn VersionedConfig>],
    target: &str,
) -> Result<CompatibilityReport> {
    let target_position = registry
        .position(target)
        .ok_or_else(|| registry.unknown(target))?;

    let mut report = CompatibilityReport {
        target: target.to_string(),
        lineage: target_position.lineage,
        lineage_mismatch: Vec::new(),
        too_new: Vec::new(),
    };
    for config in batch {
        let version = config.version();
        let position = registry
            .position(version)
            .ok_or_else(|| registry.unknown(version))?;
        if position.lineage != target_position.lineage {
            push_unique(&mut report.lineage_mismatch, version);
        } else if position.index > target_position.index {
            push_unique(&mut report.too_new, version);
        }
    }

    debug!(
        target,
        mismatched = report.lineage_mismatch.len(),
        too_new = report.too_new.len(),
        "checked compatibility"
    );
    Ok(report)
}

/// Whether every document can be upgraded to `target`. Upgrades nothing.
pub fn is_compatible_with(
    registry: &SchemaRegistry,
    batch: &[Box<dyn VersionedConfig>],
    target: &str,
) -> Result<()> {
    check_compatibility(registry, batch, target)?.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::{
        v1alpha1, v1beta1, v2alpha1, v2beta1, v2beta14, v2beta29, v3alpha1, v4beta1,
    };

    fn at(version: &str) -> Box<dyn VersionedConfig> {
        Box::new(v1alpha1::SkaffoldConfig {
            api_version: version.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_resolve_v1_batch() {
        let registry = SchemaRegistry::builtin();
        let batch = vec![
            at(v1alpha1::VERSION),
            at(v1beta1::VERSION),
            at(v2alpha1::VERSION),
            at(v2beta1::VERSION),
        ];
        assert_eq!(
            resolve_common_version(&registry, &batch).unwrap(),
            v2beta29::VERSION
        );
    }

    #[test]
    fn test_resolve_v2_batch() {
        let registry = SchemaRegistry::builtin();
        let batch = vec![at(v3alpha1::VERSION)];
        assert_eq!(
            resolve_common_version(&registry, &batch).unwrap(),
            v4beta1::VERSION
        );
    }

    #[test]
    fn test_resolve_mixed_batch() {
        let registry = SchemaRegistry::builtin();
        let batch = vec![at(v1alpha1::VERSION), at(v3alpha1::VERSION), at(v1alpha1::VERSION)];
        match resolve_common_version(&registry, &batch).unwrap_err() {
            SchemaError::IncompatibleVersions { older, newer } => {
                assert_eq!(older, vec![v1alpha1::VERSION]);
                assert_eq!(newer, vec![v3alpha1::VERSION]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_unknown_version() {
        let registry = SchemaRegistry::builtin();
        let err = resolve_common_version(&registry, &[at("vXalphaY")]).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownVersion { .. }));
    }

    #[test]
    fn test_resolve_empty_batch() {
        let registry = SchemaRegistry::builtin();
        assert_eq!(resolve_common_version(&registry, &[]).unwrap(), registry.latest());
    }

    #[test]
    fn test_v1_batch_compatible_with_v1_target() {
        let registry = SchemaRegistry::builtin();
        let batch = vec![
            at(v1alpha1::VERSION),
            at(v1beta1::VERSION),
            at(v2alpha1::VERSION),
            at(v2beta1::VERSION),
        ];
        assert!(is_compatible_with(&registry, &batch, v2beta14::VERSION).is_ok());
    }

    #[test]
    fn test_v1_batch_incompatible_with_v2_target() {
        let registry = SchemaRegistry::builtin();
        let batch = vec![at(v1alpha1::VERSION), at(v1beta1::VERSION)];
        let report = check_compatibility(&registry, &batch, v4beta1::VERSION).unwrap();
        assert!(!report.is_compatible());
        assert_eq!(report.lineage_mismatch, vec![v1alpha1::VERSION, v1beta1::VERSION]);

        let err = report.into_result().unwrap_err();
        assert!(err.to_string().contains("upgrade aborted"));
    }

    #[test]
    fn test_v2_batch_incompatible_with_v1_target() {
        let registry = SchemaRegistry::builtin();
        let batch = vec![at(v3alpha1::VERSION), at(v4beta1::VERSION)];
        let err = is_compatible_with(&registry, &batch, v2beta29::VERSION).unwrap_err();
        assert!(matches!(err, SchemaError::IncompatibleWithTarget { .. }));
    }

    #[test]
    fn test_newer_than_target_is_a_downgrade() {
        let registry = SchemaRegistry::builtin();
        let batch = vec![at(v1alpha1::VERSION), at(v2beta29::VERSION)];
        let err = is_compatible_with(&registry, &batch, v2beta14::VERSION).unwrap_err();
        match err {
            SchemaError::Downgrade { versions, target } => {
                assert_eq!(versions, vec![v2beta29::VERSION]);
                assert_eq!(target, v2beta14::VERSION);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_mismatch_and_downgrade_reported_together() {
        let registry = SchemaRegistry::builtin();
        let batch = vec![at(v3alpha1::VERSION), at(v2beta29::VERSION), at(v1alpha1::VERSION)];
        let err = is_compatible_with(&registry, &batch, v2beta14::VERSION).unwrap_err();
        match &err {
            SchemaError::IncompatibleWithTarget {
                target,
                versions,
                newer,
            } => {
                assert_eq!(target, v2beta14::VERSION);
                assert_eq!(versions, &vec![v3alpha1::VERSION]);
                assert_eq!(newer, &vec![v2beta29::VERSION]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("cannot be downgraded"), "{err}");
    }

    #[test]
    fn test_unknown_target() {
        let registry = SchemaRegistry::builtin();
        let err = is_compatible_with(&registry, &[], "skaffold/v9").unwrap_err();
        assert!(matches!(err, SchemaError::UnknownVersion { .. }));
        assert!(is_compatible_with(&registry, &[], v2beta14::VERSION).is_ok());
    }
}
