//! Upgrade Chain Runner
//!
//! Moves documents forward one registered version at a time. Every step
//! produces a new document; the input is never modified.

use tracing::{debug, info};

use crate::compatibility::is_compatible_with;
use crate::error::{Result, SchemaError};
use crate::registry::SchemaRegistry;
use crate::versioned::VersionedConfig;

/// One upgrade step, checked against the registry's ordering
fn step(
    registry: &SchemaRegistry,
    config: &dyn VersionedConfig,
) -> Result<Box<dyn VersionedConfig>> {
    let from = config.version();
    let next = config.upgrade()?;
    match registry.next_of(from) {
        Some(expected) if expected == next.version() => {
            debug!(from, to = expected, "upgraded document");
            Ok(next)
        }
        expected => Err(SchemaError::Upgrade {
            from: from.to_string(),
            to: expected.unwrap_or_default().to_string(),
            reason: format!("step produced {:?} instead", next.version()),
        }),
    }
}

/// Upgrade a document until it reaches the terminal version of its lineage.
///
/// The step out of the terminal version always fails and ends the chain;
/// a failure anywhere before it is returned as is.
pub fn run_chain(
    registry: &SchemaRegistry,
    config: Box<dyn VersionedConfig>,
) -> Result<Box<dyn VersionedConfig>> {
    let mut current = config;
    loop {
        if registry.position(current.version()).is_none() {
            return Err(registry.unknown(current.version()));
        }
        match step(registry, current.as_ref()) {
            Ok(next) => current = next,
            Err(_) if registry.is_terminal(current.version()) => return Ok(current),
            Err(e) => return Err(e),
        }
    }
}

/// Upgrade copies of every document to exactly `target`.
///
/// Fails without upgrading anything when a document belongs to another
/// lineage or is already past `target`.
pub fn upgrade_to(
    registry: &SchemaRegistry,
    batch: &[Box<dyn VersionedConfig>],
    target: &str,
) -> Result<Vec<Box<dyn VersionedConfig>>> {
    is_compatible_with(registry, batch, target)?;

    let mut upgraded = Vec::with_capacity(batch.len());
    for config in batch {
        let mut current = config.clone();
        while current.version() != target {
            current = step(registry, current.as_ref())?;
        }
        upgraded.push(current);
    }

    info!(documents = upgraded.len(), target, "upgraded batch");
    Ok(upgraded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::{v1alpha1, v2beta14, v2beta29, v3, v3alpha1, v4beta1};
    use crate::versioned::SchemaDocument;

    fn at<T: SchemaDocument>() -> Box<dyn VersionedConfig> {
        let config: T = serde_yaml::from_str(&format!("apiVersion: {}\n", T::VERSION)).unwrap();
        Box::new(config)
    }

    #[test]
    fn test_chain_reaches_lineage_terminal() {
        let registry = SchemaRegistry::builtin();
        let upgraded = run_chain(&registry, at::<v1alpha1::SkaffoldConfig>()).unwrap();
        assert_eq!(upgraded.version(), v2beta29::VERSION);

        let upgraded = run_chain(&registry, at::<v3alpha1::SkaffoldConfig>()).unwrap();
        assert_eq!(upgraded.version(), v4beta1::VERSION);
    }

    #[test]
    fn test_chain_at_terminal_is_unchanged() {
        let registry = SchemaRegistry::builtin();
        let upgraded = run_chain(&registry, at::<v4beta1::SkaffoldConfig>()).unwrap();
        assert_eq!(upgraded.version(), v4beta1::VERSION);
    }

    #[test]
    fn test_chain_propagates_transform_failure() {
        let registry = SchemaRegistry::builtin();
        let config: v1alpha1::SkaffoldConfig =
            serde_yaml::from_str("apiVersion: skaffold/v1alpha1\nbuild:\n  tagPolicy: latest\n")
                .unwrap();
        let err = run_chain(&registry, Box::new(config)).unwrap_err();
        assert!(matches!(err, SchemaError::Upgrade { ref from, .. } if from == v1alpha1::VERSION));
    }

    #[test]
    fn test_upgrade_to_intermediate_target() {
        let registry = SchemaRegistry::builtin();
        let batch = vec![at::<v1alpha1::SkaffoldConfig>(), at::<v2beta14::SkaffoldConfig>()];
        let upgraded = upgrade_to(&registry, &batch, v2beta14::VERSION).unwrap();
        assert!(upgraded.iter().all(|c| c.version() == v2beta14::VERSION));
        // inputs are left alone
        assert_eq!(batch[0].version(), v1alpha1::VERSION);
    }

    #[test]
    fn test_upgrade_to_older_target_fails() {
        let registry = SchemaRegistry::builtin();
        let batch = vec![at::<v4beta1::SkaffoldConfig>()];
        let err = upgrade_to(&registry, &batch, v3::VERSION).unwrap_err();
        assert!(matches!(err, SchemaError::Downgrade { .. }));
    }
}
