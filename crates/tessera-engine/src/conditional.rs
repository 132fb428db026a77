//! # Conditional Matching
//!
//! A binding's match predicate over an event's context attributes. Three
//! predicate kinds, combined with logical AND when more than one is
//! present: exact-value matches on named attributes, a regular-expression
//! match on the logical path, and a metadata-existence lookup against the
//! catalog. An absent conditional always matches; an attribute the
//! context does not carry makes the predicate false, never an error.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use tessera_catalog::{Catalog, CatalogError, EntityRef};
use tessera_core::context::split_logical_path;
use tessera_core::{Context, EngineError};

/// The entity kind a metadata predicate inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    DataObject,
    Collection,
    Resource,
    User,
}

/// A metadata-existence predicate: true when the resolved entity carries
/// the attribute (and, when given, the value and units).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataPredicate {
    /// Which entity, resolved from the context, to inspect.
    pub entity_type: EntityKind,
    /// The attribute that must exist.
    pub attribute: String,
    /// Required value, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Required units, when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    /// For collections, also accept the attribute on any ancestor.
    #[serde(default)]
    pub recursive: bool,
}

/// A binding's match predicate. All present parts must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditional {
    /// Exact-value matches on named context attributes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    /// Regular expression the `logical_path` attribute must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logical_path_regex: Option<String>,
    /// Metadata lookup against the catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MetadataPredicate>,
}

impl Conditional {
    /// A conditional gating on the logical path alone.
    pub fn path_regex(pattern: impl Into<String>) -> Self {
        Self {
            logical_path_regex: Some(pattern.into()),
            ..Self::default()
        }
    }

    /// A conditional gating on one exact attribute value.
    pub fn attribute(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(key.into(), value.into());
        Self {
            attributes,
            ..Self::default()
        }
    }

    /// Evaluate this conditional against an event context.
    ///
    /// `binding` names the owning binding for error reporting. A malformed
    /// regular expression is a conditional-evaluation error; everything
    /// else resolves to a plain boolean.
    pub fn matches(
        &self,
        binding: &str,
        context: &Context,
        catalog: &dyn Catalog,
    ) -> Result<bool, EngineError> {
        for (key, expected) in &self.attributes {
            if context.get(key) != Some(expected.as_str()) {
                return Ok(false);
            }
        }

        if let Some(pattern) = &self.logical_path_regex {
            let regex = Regex::new(pattern).map_err(|e| EngineError::ConditionalEvaluation {
                binding: binding.to_string(),
                reason: format!("invalid logical_path_regex [{pattern}]: {e}"),
            })?;
            match context.logical_path() {
                Some(path) if regex.is_match(path) => {}
                _ => return Ok(false),
            }
        }

        if let Some(predicate) = &self.metadata {
            if !metadata_holds(predicate, context, catalog)? {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

fn metadata_holds(
    predicate: &MetadataPredicate,
    context: &Context,
    catalog: &dyn Catalog,
) -> Result<bool, EngineError> {
    let Some(start) = entity_for(predicate.entity_type, context, catalog) else {
        return Ok(false);
    };

    let mut current = Some(start);
    while let Some(entity) = current {
        match catalog.metadata(&entity) {
            Ok(attrs) => {
                if let Some(found) = attrs.get(&predicate.attribute) {
                    let value_ok = predicate
                        .value
                        .as_ref()
                        .map_or(true, |v| *v == found.value);
                    let units_ok = predicate
                        .units
                        .as_ref()
                        .map_or(true, |u| Some(u) == found.units.as_ref());
                    if value_ok && units_ok {
                        return Ok(true);
                    }
                }
            }
            // Unknown entities fail the predicate rather than the binding.
            Err(
                CatalogError::ObjectNotFound { .. }
                | CatalogError::CollectionNotFound { .. }
                | CatalogError::ResourceNotFound { .. },
            ) => return Ok(false),
            Err(other) => return Err(other.into()),
        }

        current = match (&entity, predicate.recursive) {
            (EntityRef::Collection(path), true) if path != "/" => {
                Some(EntityRef::Collection(split_logical_path(path).0))
            }
            _ => None,
        };
    }

    Ok(false)
}

/// Resolve the entity a predicate inspects from the event context.
fn entity_for(kind: EntityKind, context: &Context, catalog: &dyn Catalog) -> Option<EntityRef> {
    match kind {
        EntityKind::DataObject => context
            .logical_path()
            .map(|p| EntityRef::DataObject(p.to_string())),
        EntityKind::Collection => {
            let path = context.logical_path()?;
            if catalog.is_collection(path) {
                Some(EntityRef::Collection(path.to_string()))
            } else {
                Some(EntityRef::Collection(split_logical_path(path).0))
            }
        }
        EntityKind::Resource => context
            .source_resource()
            .or_else(|| context.destination_resource())
            .map(|r| EntityRef::Resource(r.to_string())),
        EntityKind::User => context.user_name().map(|u| EntityRef::User(u.to_string())),
    }
}
