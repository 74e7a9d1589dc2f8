//! Testbed catalog
//!
//! The catalog arrives grouped (`{ "A-Z": [testbed, ...], ... }`) and is
//! flattened once into a name-addressable set that stays immutable for the
//! rest of the session.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised while loading a catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Origin of a subtype's sample file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtypeKind {
    Regular,
    Ood,
}

/// A specific sample file within a testbed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtype {
    /// Subtype name, unique within its testbed
    pub subtype: String,

    /// Backend-relative path of the sample file
    pub file_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<SubtypeKind>,
}

impl Subtype {
    pub fn new(subtype: impl Into<String>, file_path: impl Into<String>) -> Self {
        Self {
            subtype: subtype.into(),
            file_path: file_path.into(),
            file_name: None,
            kind: None,
        }
    }
}

/// A named source of catalogued text samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Testbed {
    #[serde(rename = "testbed_name")]
    pub name: String,

    #[serde(default)]
    pub subtypes: Vec<Subtype>,
}

impl Testbed {
    pub fn new(name: impl Into<String>, subtypes: Vec<Subtype>) -> Self {
        Self {
            name: name.into(),
            subtypes,
        }
    }

    /// Look up a subtype by name
    pub fn subtype(&self, name: &str) -> Option<&Subtype> {
        self.subtypes.iter().find(|s| s.subtype == name)
    }

    /// Subtype names in catalog order
    pub fn subtype_names(&self) -> Vec<String> {
        self.subtypes.iter().map(|s| s.subtype.clone()).collect()
    }
}

/// Flattened, name-addressable set of testbeds
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    testbeds: Vec<Testbed>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog from a flat testbed list, keeping the first testbed
    /// seen for any duplicated name.
    pub fn from_testbeds(testbeds: impl IntoIterator<Item = Testbed>) -> Self {
        let mut catalog = Self::default();

        for testbed in testbeds {
            if catalog.index.contains_key(&testbed.name) {
                warn!(testbed = %testbed.name, "Duplicate testbed name in catalog, keeping first");
                continue;
            }
            catalog
                .index
                .insert(testbed.name.clone(), catalog.testbeds.len());
            catalog.testbeds.push(testbed);
        }

        debug!(testbeds = catalog.testbeds.len(), "Catalog built");
        catalog
    }

    /// Flatten a grouped catalog. Groups are visited in key order.
    pub fn from_groups(groups: BTreeMap<String, Vec<Testbed>>) -> Self {
        Self::from_testbeds(groups.into_values().flatten())
    }

    /// Parse the grouped JSON shape `{ "<group>": [Testbed, ...] }`
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let groups: BTreeMap<String, Vec<Testbed>> = serde_json::from_str(json)?;
        Ok(Self::from_groups(groups))
    }

    /// Load a grouped catalog from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn get(&self, name: &str) -> Option<&Testbed> {
        self.index.get(name).map(|&idx| &self.testbeds[idx])
    }

    /// Resolve a testbed/subtype pair to its subtype record
    pub fn resolve(&self, testbed: &str, subtype: &str) -> Option<&Subtype> {
        self.get(testbed).and_then(|t| t.subtype(subtype))
    }

    pub fn testbeds(&self) -> &[Testbed] {
        &self.testbeds
    }

    pub fn len(&self) -> usize {
        self.testbeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.testbeds.is_empty()
    }
}
