//! Skaffold configuration schemas
//!
//! Every historical revision of the `skaffold.yaml` schema, and the engine
//! that brings a config written against any of them up to date.
//!
//! ## Features
//!
//! - **Version Registry**: every revision, ordered within two lineages
//! - **Detection**: cheap "is this one of ours" check on raw files
//! - **Strict Decoding**: each document decoded at the version it declares
//! - **Upgrade Chain**: one hand-written transform per revision, applied
//!   until the lineage's newest shape is reached
//! - **Compatibility Checks**: multi-document files must stay within one lineage
//!
//! ## Lineages
//!
//! ```text
//! v1: v1alpha1 → v1alpha2 → v1beta1 → v1beta6 → v2alpha1 → v2beta1
//!       → v2beta8 → v2beta14 → v2beta29
//! v2: v3alpha1 → v3 → v4beta1
//! ```
//!
//! The lineages are not connected: a v1 config upgrades to `v2beta29` and
//! stops there.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use skaffold_schema::{parse_config_and_upgrade, SchemaRegistry};
//!
//! let registry = SchemaRegistry::builtin();
//! let configs = parse_config_and_upgrade(&registry, Path::new("skaffold.yaml"))?;
//! for config in &configs {
//!     println!("{}", config.version());
//! }
//! # Ok::<(), skaffold_schema::SchemaError>(())
//! ```

pub mod checksum;
pub mod compatibility;
pub mod config;
pub mod decode;
pub mod detect;
pub mod error;
pub mod parse;
pub mod registry;
pub mod schemas;
pub mod upgrade;
pub mod versioned;

pub use checksum::Checksum;
pub use compatibility::{
    check_compatibility, is_compatible_with, resolve_common_version, CompatibilityReport,
};
pub use config::ToolConfig;
pub use decode::{decode_all, decode_document, decode_value, split_documents, RawDocument};
pub use detect::{is_config_document, is_config_text};
pub use error::{Result, SchemaError};
pub use parse::{
    is_skaffold_config, marshal, parse_and_upgrade_str, parse_config, parse_config_and_upgrade,
    read_input,
};
pub use registry::{Lineage, SchemaRegistry, VersionEntry};
pub use upgrade::{run_chain, upgrade_to};
pub use versioned::{SchemaDocument, VersionedConfig};
