//! Version Registry
//!
//! An ordered table of every schema revision, split into two disjoint
//! lineages. The registry is built once at startup and only read afterwards;
//! it is passed explicitly to every engine entry point.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::schemas::{
    v1alpha1, v1alpha2, v1beta1, v1beta6, v2alpha1, v2beta1, v2beta14, v2beta29, v2beta8, v3,
    v3alpha1, v4beta1,
};
use crate::versioned::{SchemaDocument, VersionedConfig};

/// One of the two independently evolved schema generations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lineage {
    /// `skaffold/v1alpha1` through `skaffold/v2beta29`
    V1,
    /// `skaffold/v3alpha1` onwards
    V2,
}

impl Lineage {
    pub const ALL: [Lineage; 2] = [Lineage::V1, Lineage::V2];

    fn index(self) -> usize {
        match self {
            Lineage::V1 => 0,
            Lineage::V2 => 1,
        }
    }
}

impl fmt::Display for Lineage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lineage::V1 => write!(f, "v1"),
            Lineage::V2 => write!(f, "v2"),
        }
    }
}

/// Zero-value constructor for one revision's document shape
pub type ConfigFactory = fn() -> Box<dyn VersionedConfig>;

/// Strict decoder from a YAML tree into one revision's document shape
pub type ConfigDecoder =
    fn(serde_yaml::Value) -> std::result::Result<Box<dyn VersionedConfig>, serde_yaml::Error>;

/// A registered schema revision
#[derive(Clone, Copy)]
pub struct VersionEntry {
    pub api_version: &'static str,
    pub factory: ConfigFactory,
    pub decoder: ConfigDecoder,
}

impl VersionEntry {
    /// Build the entry for a document type
    pub fn of<T: SchemaDocument>() -> Self {
        Self {
            api_version: T::VERSION,
            factory: new_config::<T>,
            decoder: decode_config::<T>,
        }
    }

    /// A fresh document with every field at its zero value
    pub fn new_config(&self) -> Box<dyn VersionedConfig> {
        (self.factory)()
    }
}

impl fmt::Debug for VersionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionEntry")
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

fn new_config<T: SchemaDocument>() -> Box<dyn VersionedConfig> {
    Box::new(T::default())
}

fn decode_config<T: SchemaDocument>(
    value: serde_yaml::Value,
) -> std::result::Result<Box<dyn VersionedConfig>, serde_yaml::Error> {
    let config: T = serde_yaml::from_value(value)?;
    Ok(Box::new(config))
}

/// Where a version sits in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub lineage: Lineage,
    /// Index in the lineage's registration order
    pub index: usize,
}

/// The main version registry
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    /// Entries per lineage, in registration order
    lineages: [Vec<VersionEntry>; 2],
    /// Identifier lookup over both lineages
    index: HashMap<&'static str, Position>,
}

impl SchemaRegistry {
    /// The registry of every revision this crate ships
    pub fn builtin() -> Self {
        let v1 = vec![
            VersionEntry::of::<v1alpha1::SkaffoldConfig>(),
            VersionEntry::of::<v1alpha2::SkaffoldConfig>(),
            VersionEntry::of::<v1beta1::SkaffoldConfig>(),
            VersionEntry::of::<v1beta6::SkaffoldConfig>(),
            VersionEntry::of::<v2alpha1::SkaffoldConfig>(),
            VersionEntry::of::<v2beta1::SkaffoldConfig>(),
            VersionEntry::of::<v2beta8::SkaffoldConfig>(),
            VersionEntry::of::<v2beta14::SkaffoldConfig>(),
            VersionEntry::of::<v2beta29::SkaffoldConfig>(),
        ];
        let v2 = vec![
            VersionEntry::of::<v3alpha1::SkaffoldConfig>(),
            VersionEntry::of::<v3::SkaffoldConfig>(),
            VersionEntry::of::<v4beta1::SkaffoldConfig>(),
        ];
        Self::assemble(v1, v2)
    }

    /// Build a registry from two lineages, oldest version first.
    ///
    /// Every identifier must be unique across both lineages and neither
    /// lineage may be empty.
    pub fn from_lineages(v1: Vec<VersionEntry>, v2: Vec<VersionEntry>) -> Result<Self> {
        for (lineage, entries) in [(Lineage::V1, &v1), (Lineage::V2, &v2)] {
            if entries.is_empty() {
                return Err(SchemaError::EmptyLineage(lineage));
            }
        }
        let mut seen = std::collections::HashSet::new();
        for entry in v1.iter().chain(v2.iter()) {
            if !seen.insert(entry.api_version) {
                return Err(SchemaError::DuplicateVersion(entry.api_version.to_string()));
            }
        }
        Ok(Self::assemble(v1, v2))
    }

    fn assemble(v1: Vec<VersionEntry>, v2: Vec<VersionEntry>) -> Self {
        let mut index = HashMap::with_capacity(v1.len() + v2.len());
        for (lineage, entries) in [(Lineage::V1, &v1), (Lineage::V2, &v2)] {
            for (i, entry) in entries.iter().enumerate() {
                index.insert(entry.api_version, Position { lineage, index: i });
            }
        }
        Self {
            lineages: [v1, v2],
            index,
        }
    }

    /// Look up a version in either lineage
    pub fn find(&self, version: &str) -> Option<&VersionEntry> {
        let position = self.position(version)?;
        self.lineages[position.lineage.index()].get(position.index)
    }

    pub fn position(&self, version: &str) -> Option<Position> {
        self.index.get(version).copied()
    }

    pub fn lineage_of(&self, version: &str) -> Option<Lineage> {
        self.position(version).map(|p| p.lineage)
    }

    /// All entries of a lineage, oldest first
    pub fn all_versions_of(&self, lineage: Lineage) -> &[VersionEntry] {
        &self.lineages[lineage.index()]
    }

    /// The newest version of a lineage
    pub fn terminal_of(&self, lineage: Lineage) -> &'static str {
        self.lineages[lineage.index()]
            .last()
            .map(|entry| entry.api_version)
            .unwrap_or_default()
    }

    /// The terminal version of the newest lineage
    pub fn latest(&self) -> &'static str {
        self.terminal_of(Lineage::V2)
    }

    pub fn is_terminal(&self, version: &str) -> bool {
        self.lineage_of(version)
            .map(|lineage| self.terminal_of(lineage) == version)
            .unwrap_or(false)
    }

    /// The version a single upgrade step leads to, if any
    pub fn next_of(&self, version: &str) -> Option<&'static str> {
        let position = self.position(version)?;
        self.lineages[position.lineage.index()]
            .get(position.index + 1)
            .map(|entry| entry.api_version)
    }

    /// Every registered identifier, v1 lineage first
    pub fn versions(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.lineages
            .iter()
            .flat_map(|entries| entries.iter().map(|entry| entry.api_version))
    }

    /// The registered identifier closest to an unknown one, for error messages
    pub fn suggest(&self, version: &str) -> Option<String> {
        let candidates: Vec<&str> = self.versions().collect();
        similar::get_close_matches(version, &candidates, 1, 0.8)
            .into_iter()
            .next()
            .map(str::to_string)
    }

    /// Error for an identifier present in neither lineage
    pub(crate) fn unknown(&self, version: &str) -> SchemaError {
        SchemaError::UnknownVersion {
            version: version.to_string(),
            suggestion: self.suggest(version),
        }
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
