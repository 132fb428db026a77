//! # Event Descriptors
//!
//! A tagged occurrence raised by the storage layer at the moment an
//! operation commits: what kind of entity was touched, which operation
//! touched it, and the attribute context describing the site of the
//! operation. Events are immutable and consumed once by the dispatcher.

use serde::{Deserialize, Serialize};

use tessera_core::Context;

/// The kind of catalog entity an event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// A data object.
    DataObject,
    /// A collection.
    Collection,
    /// A storage resource.
    Resource,
    /// A user.
    User,
}

/// The operation that raised an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventVerb {
    Put,
    Get,
    Create,
    Modify,
    Remove,
    Rename,
    Register,
    Unregister,
    Replicate,
    Checksum,
    Copy,
    Seek,
    Truncate,
    Open,
    Close,
    Write,
}

impl EventVerb {
    /// The wire name of the verb, as it appears in binding tables.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Put => "put",
            Self::Get => "get",
            Self::Create => "create",
            Self::Modify => "modify",
            Self::Remove => "remove",
            Self::Rename => "rename",
            Self::Register => "register",
            Self::Unregister => "unregister",
            Self::Replicate => "replicate",
            Self::Checksum => "checksum",
            Self::Copy => "copy",
            Self::Seek => "seek",
            Self::Truncate => "truncate",
            Self::Open => "open",
            Self::Close => "close",
            Self::Write => "write",
        }
    }
}

impl std::fmt::Display for EventVerb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One storage-layer occurrence, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// The entity kind the event concerns.
    pub category: EventCategory,
    /// The operation that raised the event.
    pub verb: EventVerb,
    /// Attributes describing the site of the operation.
    pub context: Context,
}

impl Event {
    /// Build an event.
    pub fn new(category: EventCategory, verb: EventVerb, context: Context) -> Self {
        Self {
            category,
            verb,
            context,
        }
    }
}
