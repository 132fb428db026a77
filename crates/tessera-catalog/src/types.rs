//! # Catalog Entity Types
//!
//! Data shapes shared across the catalog contract: entity references for
//! metadata operations, metadata values, replica descriptions, and
//! collection listings.

use serde::{Deserialize, Serialize};

/// A reference to a catalog entity for metadata operations.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "entity_type", content = "name", rename_all = "snake_case")]
pub enum EntityRef {
    /// A data object, addressed by logical path.
    DataObject(String),
    /// A collection, addressed by logical path.
    Collection(String),
    /// A storage resource, addressed by name.
    Resource(String),
    /// A user, addressed by name.
    User(String),
}

impl EntityRef {
    /// The entity's address (logical path or name).
    pub fn name(&self) -> &str {
        match self {
            Self::DataObject(s) | Self::Collection(s) | Self::Resource(s) | Self::User(s) => s,
        }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DataObject(s) => write!(f, "data_object:{s}"),
            Self::Collection(s) => write!(f, "collection:{s}"),
            Self::Resource(s) => write!(f, "resource:{s}"),
            Self::User(s) => write!(f, "user:{s}"),
        }
    }
}

/// A metadata value with optional units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValue {
    /// The attribute value.
    pub value: String,
    /// Optional units annotation.
    pub units: Option<String>,
}

impl AttributeValue {
    /// A unit-less attribute value.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            units: None,
        }
    }

    /// An attribute value with units.
    pub fn with_units(value: impl Into<String>, units: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            units: Some(units.into()),
        }
    }
}

/// One physical copy of a logical object, as recorded in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaInfo {
    /// The resource holding this replica.
    pub resource: String,
    /// The physical path within the resource's vault.
    pub physical_path: String,
    /// The size recorded in the catalog, in bytes.
    pub size: u64,
    /// The checksum recorded in the catalog, if one has been computed.
    pub checksum: Option<String>,
}

/// One entry of a collection listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum CollectionEntry {
    /// A data object within the collection.
    DataObject(String),
    /// A sub-collection.
    Collection(String),
}
