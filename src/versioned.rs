//! Versioned configuration documents
//!
//! Every historical schema revision is a concrete Rust type implementing
//! [`SchemaDocument`]. The engine itself only ever handles them as
//! `Box<dyn VersionedConfig>`, which is what the registry constructs, the
//! decoder produces and the upgrade chain consumes.

use std::any::Any;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, SchemaError};

/// A decoded configuration document at exactly one schema version.
pub trait VersionedConfig: fmt::Debug + Send + Sync + 'static {
    /// The `apiVersion` this document declares
    fn version(&self) -> &str;

    /// Produce a new document at the next version of the lineage.
    ///
    /// The receiver is left untouched. Fails for the terminal version.
    fn upgrade(&self) -> Result<Box<dyn VersionedConfig>>;

    /// Check constraints that the YAML shape alone cannot express
    fn validate(&self) -> Result<()>;

    /// Serialize back to a single YAML document
    fn to_yaml(&self) -> Result<String>;

    /// Serialize to JSON, for tooling output
    fn to_json(&self) -> serde_json::Result<serde_json::Value>;

    fn clone_box(&self) -> Box<dyn VersionedConfig>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

/// Implemented once per schema revision.
pub trait SchemaDocument:
    Clone + fmt::Debug + Default + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// The identifier this type is registered under
    const VERSION: &'static str;

    fn api_version(&self) -> &str;

    /// Structural transform to the immediate successor revision
    fn upgrade_to_next(&self) -> Result<Box<dyn VersionedConfig>>;

    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

impl<T: SchemaDocument> VersionedConfig for T {
    fn version(&self) -> &str {
        self.api_version()
    }

    fn upgrade(&self) -> Result<Box<dyn VersionedConfig>> {
        self.upgrade_to_next()
    }

    fn validate(&self) -> Result<()> {
        SchemaDocument::validate(self)
    }

    fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    fn clone_box(&self) -> Box<dyn VersionedConfig> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl dyn VersionedConfig {
    /// Borrow the concrete document type, if it is `T`
    pub fn downcast_ref<T: SchemaDocument>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Take the concrete document type out of the box, if it is `T`
    pub fn downcast<T: SchemaDocument>(self: Box<Self>) -> Option<T> {
        self.into_any().downcast::<T>().ok().map(|b| *b)
    }
}

impl Clone for Box<dyn VersionedConfig> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Error for the upgrade step of a lineage's terminal version.
pub(crate) fn terminal(version: &str) -> SchemaError {
    SchemaError::TerminalVersion {
        version: version.to_string(),
    }
}
