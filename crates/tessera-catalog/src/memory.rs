//! # In-Memory Catalog
//!
//! A process-local [`Catalog`] used by the test suites and by demo
//! wiring. It keeps logical objects, replicas (with their physical
//! bytes), collections, resources, users, and metadata in a single
//! mutex-guarded state table, and evaluates catalog queries against
//! three derived relations: replicas, collections, and resources.

use std::collections::{BTreeMap, BTreeSet};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use tessera_core::context::split_logical_path;

use crate::catalog::Catalog;
use crate::error::CatalogError;
use crate::query::{self, ParsedQuery};
use crate::types::{AttributeValue, CollectionEntry, EntityRef, ReplicaInfo};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ReplicaRecord {
    resource: String,
    physical_path: String,
    /// Size recorded in the catalog at registration time.
    catalog_size: u64,
    /// Checksum recorded in the catalog at registration time.
    catalog_checksum: Option<String>,
    /// The physical bytes; may drift from the catalog record.
    content: Vec<u8>,
}

#[derive(Debug, Clone)]
struct ObjectRecord {
    owner: String,
    replicas: Vec<ReplicaRecord>,
}

#[derive(Debug, Clone)]
struct ResourceRecord {
    vault_path: String,
    capacity_bytes: u64,
}

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<String, ObjectRecord>,
    collections: BTreeSet<String>,
    resources: BTreeMap<String, ResourceRecord>,
    users: BTreeSet<String>,
    metadata: BTreeMap<EntityRef, BTreeMap<String, AttributeValue>>,
}

/// An in-memory [`Catalog`] with construction helpers for seeding state.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    state: Mutex<State>,
}

impl MemoryCatalog {
    /// An empty catalog containing only the root collection `/`.
    pub fn new() -> Self {
        let catalog = Self::default();
        catalog.state().collections.insert("/".to_string());
        catalog
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- seeding -----------------------------------------------------------

    /// Register a storage resource with the given vault root and capacity.
    pub fn add_resource(&self, name: &str, vault_path: &str, capacity_bytes: u64) {
        self.state().resources.insert(
            name.to_string(),
            ResourceRecord {
                vault_path: vault_path.to_string(),
                capacity_bytes,
            },
        );
    }

    /// Register a user.
    pub fn add_user(&self, name: &str) {
        self.state().users.insert(name.to_string());
    }

    /// Register a collection, creating missing ancestors.
    pub fn ensure_collection(&self, logical_path: &str) {
        let mut state = self.state();
        Self::ensure_collection_locked(&mut state, logical_path);
    }

    fn ensure_collection_locked(state: &mut State, logical_path: &str) {
        let mut current = logical_path.to_string();
        loop {
            state.collections.insert(current.clone());
            if current == "/" {
                break;
            }
            let (parent, _) = split_logical_path(&current);
            current = parent;
        }
    }

    /// Register a data object with one replica on `resource` holding
    /// `content`. The catalog size and checksum are recorded from the
    /// content, and missing ancestor collections are created.
    pub fn put_object(&self, logical_path: &str, owner: &str, resource: &str, content: &[u8]) {
        let mut state = self.state();
        let vault = state
            .resources
            .get(resource)
            .map(|r| r.vault_path.clone())
            .unwrap_or_else(|| format!("/vault/{resource}"));
        let (parent, _) = split_logical_path(logical_path);
        Self::ensure_collection_locked(&mut state, &parent);
        state.users.insert(owner.to_string());
        let replica = ReplicaRecord {
            resource: resource.to_string(),
            physical_path: format!("{vault}{logical_path}"),
            catalog_size: content.len() as u64,
            catalog_checksum: Some(content_checksum(content)),
            content: content.to_vec(),
        };
        state.objects.insert(
            logical_path.to_string(),
            ObjectRecord {
                owner: owner.to_string(),
                replicas: vec![replica],
            },
        );
    }

    /// Drop the recorded checksum of one replica. Used to stage the
    /// never-checksummed case.
    pub fn clear_checksum(&self, logical_path: &str, resource: &str) {
        let mut state = self.state();
        if let Some(object) = state.objects.get_mut(logical_path) {
            if let Some(replica) = object
                .replicas
                .iter_mut()
                .find(|r| r.resource == resource)
            {
                replica.catalog_checksum = None;
            }
        }
    }

    /// Flip the physical bytes of one replica so they no longer match the
    /// catalog record. Used to stage verification failures.
    pub fn corrupt_replica(&self, logical_path: &str, resource: &str) {
        let mut state = self.state();
        if let Some(object) = state.objects.get_mut(logical_path) {
            if let Some(replica) = object
                .replicas
                .iter_mut()
                .find(|r| r.resource == resource)
            {
                replica.content.extend_from_slice(b"!corrupt");
            }
        }
    }

    // -- query evaluation --------------------------------------------------

    fn rows_for(&self, parsed: &ParsedQuery) -> Result<Vec<BTreeMap<String, String>>, CatalogError> {
        let touches_resc = parsed.references("META_RESC_ATTR")
            || (parsed.references("RESC_")
                && !parsed.references("DATA_")
                && !parsed.references("COLL_")
                && !parsed.references("USER_")
                && !parsed.references("META_DATA"));
        let touches_coll = parsed.references("META_COLL_ATTR")
            || (parsed.references("COLL_NAME")
                && !parsed.references("DATA_")
                && !parsed.references("USER_")
                && !parsed.references("RESC_")
                && !parsed.references("META_DATA"));

        let state = self.state();
        if touches_resc {
            Ok(Self::resource_rows(&state, parsed))
        } else if touches_coll {
            Ok(Self::collection_rows(&state, parsed))
        } else {
            Ok(Self::replica_rows(&state, parsed))
        }
    }

    /// One row per (object, replica), cross-joined with the object's
    /// metadata triples when the query touches `META_DATA_ATTR` columns.
    fn replica_rows(state: &State, parsed: &ParsedQuery) -> Vec<BTreeMap<String, String>> {
        let join_metadata = parsed.references("META_DATA_ATTR");
        let mut rows = Vec::new();
        for (path, object) in &state.objects {
            let (coll, name) = split_logical_path(path);
            let entity = EntityRef::DataObject(path.clone());
            let triples: Vec<(&String, &AttributeValue)> = state
                .metadata
                .get(&entity)
                .map(|m| m.iter().collect())
                .unwrap_or_default();
            for replica in &object.replicas {
                let mut base = BTreeMap::new();
                base.insert("USER_NAME".to_string(), object.owner.clone());
                base.insert("COLL_NAME".to_string(), coll.clone());
                base.insert("DATA_NAME".to_string(), name.clone());
                base.insert("RESC_NAME".to_string(), replica.resource.clone());
                base.insert("DATA_PATH".to_string(), replica.physical_path.clone());
                base.insert("DATA_SIZE".to_string(), replica.catalog_size.to_string());
                base.insert(
                    "DATA_CHECKSUM".to_string(),
                    replica.catalog_checksum.clone().unwrap_or_default(),
                );
                if join_metadata {
                    // Objects without metadata produce no joined rows.
                    for (attr, value) in &triples {
                        let mut row = base.clone();
                        row.insert("META_DATA_ATTR_NAME".to_string(), (*attr).clone());
                        row.insert("META_DATA_ATTR_VALUE".to_string(), value.value.clone());
                        row.insert(
                            "META_DATA_ATTR_UNITS".to_string(),
                            value.units.clone().unwrap_or_default(),
                        );
                        rows.push(row);
                    }
                } else {
                    rows.push(base);
                }
            }
        }
        rows
    }

    fn collection_rows(state: &State, parsed: &ParsedQuery) -> Vec<BTreeMap<String, String>> {
        let join_metadata = parsed.references("META_COLL_ATTR");
        let mut rows = Vec::new();
        for coll in &state.collections {
            let mut base = BTreeMap::new();
            base.insert("COLL_NAME".to_string(), coll.clone());
            if join_metadata {
                let entity = EntityRef::Collection(coll.clone());
                let Some(triples) = state.metadata.get(&entity) else {
                    continue;
                };
                for (attr, value) in triples {
                    let mut row = base.clone();
                    row.insert("META_COLL_ATTR_NAME".to_string(), attr.clone());
                    row.insert("META_COLL_ATTR_VALUE".to_string(), value.value.clone());
                    row.insert(
                        "META_COLL_ATTR_UNITS".to_string(),
                        value.units.clone().unwrap_or_default(),
                    );
                    rows.push(row);
                }
            } else {
                rows.push(base);
            }
        }
        rows
    }

    fn resource_rows(state: &State, parsed: &ParsedQuery) -> Vec<BTreeMap<String, String>> {
        let join_metadata = parsed.references("META_RESC_ATTR");
        let mut rows = Vec::new();
        for (name, record) in &state.resources {
            let mut base = BTreeMap::new();
            base.insert("RESC_NAME".to_string(), name.clone());
            base.insert("RESC_VAULT_PATH".to_string(), record.vault_path.clone());
            if join_metadata {
                let entity = EntityRef::Resource(name.clone());
                let Some(triples) = state.metadata.get(&entity) else {
                    continue;
                };
                for (attr, value) in triples {
                    let mut row = base.clone();
                    row.insert("META_RESC_ATTR_NAME".to_string(), attr.clone());
                    row.insert("META_RESC_ATTR_VALUE".to_string(), value.value.clone());
                    row.insert(
                        "META_RESC_ATTR_UNITS".to_string(),
                        value.units.clone().unwrap_or_default(),
                    );
                    rows.push(row);
                }
            } else {
                rows.push(base);
            }
        }
        rows
    }

    fn entity_exists(state: &State, entity: &EntityRef) -> Result<(), CatalogError> {
        match entity {
            EntityRef::DataObject(path) => {
                if state.objects.contains_key(path) {
                    Ok(())
                } else {
                    Err(CatalogError::ObjectNotFound { path: path.clone() })
                }
            }
            EntityRef::Collection(path) => {
                if state.collections.contains(path) {
                    Ok(())
                } else {
                    Err(CatalogError::CollectionNotFound { path: path.clone() })
                }
            }
            EntityRef::Resource(name) => {
                if state.resources.contains_key(name) {
                    Ok(())
                } else {
                    Err(CatalogError::ResourceNotFound { name: name.clone() })
                }
            }
            EntityRef::User(_) => Ok(()),
        }
    }
}

fn content_checksum(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

// ---------------------------------------------------------------------------
// Catalog impl
// ---------------------------------------------------------------------------

impl Catalog for MemoryCatalog {
    fn query(&self, query_string: &str, limit: u32) -> Result<Vec<Vec<String>>, CatalogError> {
        let parsed = query::parse(query_string)?;
        let candidates = self.rows_for(&parsed)?;

        let mut seen = BTreeSet::new();
        let mut results = Vec::new();
        'rows: for row in candidates {
            for cond in &parsed.conditions {
                let Some(actual) = row.get(&cond.column) else {
                    return Err(CatalogError::Query(format!(
                        "unknown column: [{}]",
                        cond.column
                    )));
                };
                if !query::condition_holds(cond, actual) {
                    continue 'rows;
                }
            }
            let mut projected = Vec::with_capacity(parsed.columns.len());
            for column in &parsed.columns {
                let value = row.get(column).ok_or_else(|| {
                    CatalogError::Query(format!("unknown column: [{column}]"))
                })?;
                projected.push(value.clone());
            }
            if seen.insert(projected.clone()) {
                results.push(projected);
            }
            if limit != 0 && results.len() as u32 >= limit {
                break;
            }
        }
        debug!(query = query_string, rows = results.len(), "query evaluated");
        Ok(results)
    }

    fn metadata(&self, entity: &EntityRef) -> Result<BTreeMap<String, AttributeValue>, CatalogError> {
        let state = self.state();
        Self::entity_exists(&state, entity)?;
        Ok(state.metadata.get(entity).cloned().unwrap_or_default())
    }

    fn set_metadata(
        &self,
        entity: &EntityRef,
        attribute: &str,
        value: &AttributeValue,
    ) -> Result<(), CatalogError> {
        let mut state = self.state();
        Self::entity_exists(&state, entity)?;
        state
            .metadata
            .entry(entity.clone())
            .or_default()
            .insert(attribute.to_string(), value.clone());
        Ok(())
    }

    fn remove_metadata(&self, entity: &EntityRef, attribute: &str) -> Result<(), CatalogError> {
        let mut state = self.state();
        Self::entity_exists(&state, entity)?;
        if let Some(map) = state.metadata.get_mut(entity) {
            map.remove(attribute);
        }
        Ok(())
    }

    fn is_collection(&self, logical_path: &str) -> bool {
        self.state().collections.contains(logical_path)
    }

    fn is_data_object(&self, logical_path: &str) -> bool {
        self.state().objects.contains_key(logical_path)
    }

    fn list_collection(&self, logical_path: &str) -> Result<Vec<CollectionEntry>, CatalogError> {
        let state = self.state();
        if !state.collections.contains(logical_path) {
            return Err(CatalogError::CollectionNotFound {
                path: logical_path.to_string(),
            });
        }
        let mut entries = Vec::new();
        for coll in &state.collections {
            if coll != logical_path && split_logical_path(coll).0 == logical_path {
                entries.push(CollectionEntry::Collection(coll.clone()));
            }
        }
        for path in state.objects.keys() {
            if split_logical_path(path).0 == logical_path {
                entries.push(CollectionEntry::DataObject(path.clone()));
            }
        }
        Ok(entries)
    }

    fn replicas(&self, logical_path: &str) -> Result<Vec<ReplicaInfo>, CatalogError> {
        let state = self.state();
        let object = state
            .objects
            .get(logical_path)
            .ok_or_else(|| CatalogError::ObjectNotFound {
                path: logical_path.to_string(),
            })?;
        Ok(object
            .replicas
            .iter()
            .map(|r| ReplicaInfo {
                resource: r.resource.clone(),
                physical_path: r.physical_path.clone(),
                size: r.catalog_size,
                checksum: r.catalog_checksum.clone(),
            })
            .collect())
    }

    fn replicate(
        &self,
        logical_path: &str,
        source: &str,
        destination: &str,
    ) -> Result<(), CatalogError> {
        let mut state = self.state();
        let vault = state
            .resources
            .get(destination)
            .map(|r| r.vault_path.clone())
            .ok_or_else(|| CatalogError::ResourceNotFound {
                name: destination.to_string(),
            })?;
        let object = state
            .objects
            .get_mut(logical_path)
            .ok_or_else(|| CatalogError::ObjectNotFound {
                path: logical_path.to_string(),
            })?;
        if object.replicas.iter().any(|r| r.resource == destination) {
            return Err(CatalogError::Conflict(format!(
                "replica of [{logical_path}] already on [{destination}]"
            )));
        }
        let origin = object
            .replicas
            .iter()
            .find(|r| r.resource == source)
            .ok_or_else(|| CatalogError::ReplicaNotFound {
                path: logical_path.to_string(),
                resource: source.to_string(),
            })?
            .clone();
        object.replicas.push(ReplicaRecord {
            resource: destination.to_string(),
            physical_path: format!("{vault}{logical_path}"),
            catalog_size: origin.catalog_size,
            catalog_checksum: origin.catalog_checksum.clone(),
            content: origin.content,
        });
        debug!(path = logical_path, source, destination, "replica created");
        Ok(())
    }

    fn remove_replica(&self, logical_path: &str, resource: &str) -> Result<(), CatalogError> {
        let mut state = self.state();
        let object = state
            .objects
            .get_mut(logical_path)
            .ok_or_else(|| CatalogError::ObjectNotFound {
                path: logical_path.to_string(),
            })?;
        let before = object.replicas.len();
        object.replicas.retain(|r| r.resource != resource);
        if object.replicas.len() == before {
            return Err(CatalogError::ReplicaNotFound {
                path: logical_path.to_string(),
                resource: resource.to_string(),
            });
        }
        if object.replicas.is_empty() {
            state.objects.remove(logical_path);
        }
        Ok(())
    }

    fn unlink(&self, logical_path: &str) -> Result<(), CatalogError> {
        let mut state = self.state();
        if state.objects.remove(logical_path).is_none() {
            return Err(CatalogError::ObjectNotFound {
                path: logical_path.to_string(),
            });
        }
        state
            .metadata
            .remove(&EntityRef::DataObject(logical_path.to_string()));
        Ok(())
    }

    fn physical_size(&self, logical_path: &str, resource: &str) -> Result<u64, CatalogError> {
        let state = self.state();
        let object = state
            .objects
            .get(logical_path)
            .ok_or_else(|| CatalogError::ObjectNotFound {
                path: logical_path.to_string(),
            })?;
        object
            .replicas
            .iter()
            .find(|r| r.resource == resource)
            .map(|r| r.content.len() as u64)
            .ok_or_else(|| CatalogError::ReplicaNotFound {
                path: logical_path.to_string(),
                resource: resource.to_string(),
            })
    }

    fn compute_checksum(
        &self,
        logical_path: &str,
        resource: &str,
    ) -> Result<String, CatalogError> {
        let state = self.state();
        let object = state
            .objects
            .get(logical_path)
            .ok_or_else(|| CatalogError::ObjectNotFound {
                path: logical_path.to_string(),
            })?;
        object
            .replicas
            .iter()
            .find(|r| r.resource == resource)
            .map(|r| content_checksum(&r.content))
            .ok_or_else(|| CatalogError::ReplicaNotFound {
                path: logical_path.to_string(),
                resource: resource.to_string(),
            })
    }

    fn record_checksum(
        &self,
        logical_path: &str,
        resource: &str,
        checksum: &str,
    ) -> Result<(), CatalogError> {
        let mut state = self.state();
        let object = state
            .objects
            .get_mut(logical_path)
            .ok_or_else(|| CatalogError::ObjectNotFound {
                path: logical_path.to_string(),
            })?;
        let replica = object
            .replicas
            .iter_mut()
            .find(|r| r.resource == resource)
            .ok_or_else(|| CatalogError::ReplicaNotFound {
                path: logical_path.to_string(),
                resource: resource.to_string(),
            })?;
        replica.catalog_checksum = Some(checksum.to_string());
        Ok(())
    }

    fn filesystem_usage(&self, resource: &str) -> Result<f64, CatalogError> {
        let state = self.state();
        let record = state
            .resources
            .get(resource)
            .ok_or_else(|| CatalogError::ResourceNotFound {
                name: resource.to_string(),
            })?;
        if record.capacity_bytes == 0 {
            return Ok(100.0);
        }
        let used: u64 = state
            .objects
            .values()
            .flat_map(|o| o.replicas.iter())
            .filter(|r| r.resource == resource)
            .map(|r| r.content.len() as u64)
            .sum();
        Ok(used as f64 / record.capacity_bytes as f64 * 100.0)
    }
}
