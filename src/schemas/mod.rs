//! Schema revisions
//!
//! One module per registered `apiVersion`. A revision only declares the types
//! that changed since its predecessor and re-exports the rest, so an unchanged
//! subtree is the very same Rust type across many revisions and upgrade steps
//! move it over untouched.
//!
//! Lineage v1: `v1alpha1` → `v1alpha2` → `v1beta1` → `v1beta6` → `v2alpha1` →
//! `v2beta1` → `v2beta8` → `v2beta14` → `v2beta29`.
//!
//! Lineage v2: `v3alpha1` → `v3` → `v4beta1`.

pub mod v1alpha1;
pub mod v1alpha2;
pub mod v1beta1;
pub mod v1beta6;
pub mod v2alpha1;
pub mod v2beta1;
pub mod v2beta14;
pub mod v2beta29;
pub mod v2beta8;
pub mod v3;
pub mod v3alpha1;
pub mod v4beta1;

/// Terminal revision of the v1 lineage
pub use v2beta29 as latest_v1;
/// Terminal revision of the v2 lineage
pub use v4beta1 as latest;

use crate::error::SchemaError;

/// The value kubectl-style tooling expects in `kind`
pub const KIND: &str = "Config";

/// A one-of group with more than one member set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneOfViolation {
    pub path: String,
    pub set: Vec<&'static str>,
}

impl OneOfViolation {
    pub(crate) fn into_error(self, version: &str) -> SchemaError {
        SchemaError::Decode {
            version: version.to_string(),
            message: format!("{}: only one of {:?} may be set", self.path, self.set),
        }
    }
}

pub(crate) type Check = std::result::Result<(), OneOfViolation>;

/// At most one member of a group may be present
pub(crate) fn one_of(path: impl FnOnce() -> String, members: &[(&'static str, bool)]) -> Check {
    let set: Vec<&'static str> = members
        .iter()
        .filter(|(_, present)| *present)
        .map(|(name, _)| *name)
        .collect();
    if set.len() > 1 {
        return Err(OneOfViolation { path: path(), set });
    }
    Ok(())
}

/// Run `check` over every element of a list, indexing the path
pub(crate) fn each<T>(path: &str, items: &[T], check: impl Fn(&str, &T) -> Check) -> Check {
    for (i, item) in items.iter().enumerate() {
        check(&format!("{path}[{i}]"), item)?;
    }
    Ok(())
}
