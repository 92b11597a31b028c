//! Hierarchical namespace store.
//!
//! The store owns an in-memory index over canonical paths and writes
//! through to a [`StorageBackend`]. The index is rebuilt from storage on
//! open; that rescan is the crash-recovery mechanism, so no separate log
//! is kept. All reads are served from the index; every durable write is
//! acknowledged by the backend before the index is touched, so a failed
//! write leaves no partial state behind.
//!
//! Locking: structural mutations (create, delete) serialize on one
//! tree-wide mutex because parent-existence and no-children checks need a
//! consistent view of the whole index. Metadata-only writes serialize on
//! a per-path lock instead and do not block unrelated paths. Reads only
//! take the index read lock.

use crate::backend::StorageBackend;
use crate::metadata::{self, MetadataDelta};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use sealbox_common::{
    CustomMetadata, Error, Namespace, NamespaceId, NamespacePath, NamespaceStoreConfig, Result,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Key prefix for persisted namespace records, keyed by canonical path.
pub const NAMESPACE_PREFIX: &str = "namespaces/";

/// Key prefix for retired-ID markers. A marker under this prefix means the
/// ID was handed out once and must never be reissued.
pub const RETIRED_ID_PREFIX: &str = "retired-ids/";

fn record_key(path: &str) -> String {
    format!("{NAMESPACE_PREFIX}{path}")
}

fn retired_key(id: &str) -> String {
    format!("{RETIRED_ID_PREFIX}{id}")
}

/// The namespace registry.
///
/// One instance is shared by reference between all callers; it is `Sync`
/// and every operation is atomic with respect to concurrent callers.
pub struct NamespaceStore {
    backend: Arc<dyn StorageBackend>,
    /// Indexed view of the tree, keyed by canonical path. Lexical order
    /// over trailing-separator paths respects tree order.
    index: RwLock<BTreeMap<String, Namespace>>,
    /// IDs that were retired by a delete and must never be reissued
    retired: RwLock<HashSet<String>>,
    /// Serializes tree-shape mutations (create, delete)
    structural: Mutex<()>,
    /// Per-path locks for metadata-only writes. Entries are never
    /// removed: a path must map to the same mutex for its whole
    /// lifetime, deletions and re-creations included, or two writers
    /// could hold different locks for the same path.
    path_locks: DashMap<String, Arc<Mutex<()>>>,
    config: NamespaceStoreConfig,
}

impl NamespaceStore {
    /// Open the store, rebuilding the in-memory index from storage.
    ///
    /// The rebuild validates what it loads: undecodable records, records
    /// stored under the wrong key, duplicate IDs, a persisted root, or an
    /// orphaned record (parent missing) are [`Error::Integrity`] failures,
    /// not ordinary not-found results.
    pub fn open(backend: Arc<dyn StorageBackend>, config: NamespaceStoreConfig) -> Result<Self> {
        let mut retired: HashSet<String> = backend
            .list(RETIRED_ID_PREFIX)?
            .into_iter()
            .map(|key| key[RETIRED_ID_PREFIX.len()..].to_string())
            .collect();

        let mut index = BTreeMap::new();
        let mut seen_ids = HashSet::new();
        for key in backend.list(NAMESPACE_PREFIX)? {
            let bytes = backend
                .get(&key)?
                .ok_or_else(|| Error::integrity(format!("listed key {key:?} is unreadable")))?;
            let ns: Namespace = serde_json::from_slice(&bytes)
                .map_err(|e| Error::integrity(format!("undecodable record at {key:?}: {e}")))?;
            if ns.path.is_root() {
                return Err(Error::integrity("root namespace must not be persisted"));
            }
            if record_key(ns.path.as_str()) != key {
                return Err(Error::integrity(format!(
                    "record at {key:?} claims path {:?}",
                    ns.path
                )));
            }
            if ns.id.is_root() || !seen_ids.insert(ns.id.as_str().to_string()) {
                return Err(Error::integrity(format!("duplicate namespace ID {}", ns.id)));
            }
            index.insert(ns.path.as_str().to_string(), ns);
        }

        for ns in index.values() {
            let parent = ns
                .path
                .parent()
                .ok_or_else(|| Error::integrity("root namespace must not be persisted"))?;
            if !parent.is_root() && !index.contains_key(parent.as_str()) {
                return Err(Error::integrity(format!(
                    "namespace {:?} has no parent {:?}",
                    ns.path, parent
                )));
            }
        }

        // A retired marker colliding with a live ID means a delete wrote
        // its marker but crashed before removing the record. The record
        // wins; drop the marker.
        let stale: Vec<String> = retired.intersection(&seen_ids).cloned().collect();
        for id in stale {
            warn!("dropping stale retired marker for live namespace ID {id}");
            backend.delete(&retired_key(&id))?;
            retired.remove(&id);
        }

        info!(
            "opened namespace store: {} namespaces, {} retired IDs",
            index.len(),
            retired.len()
        );

        Ok(Self {
            backend,
            index: RwLock::new(index),
            retired: RwLock::new(retired),
            structural: Mutex::new(()),
            path_locks: DashMap::new(),
            config,
        })
    }

    /// Exact lookup. Absent is not an error; the root always resolves.
    pub fn get(&self, path: &str) -> Result<Option<Namespace>> {
        let path = NamespacePath::parse(path)?;
        if path.is_root() {
            return Ok(Some(Namespace::root()));
        }
        Ok(self.index.read().get(path.as_str()).cloned())
    }

    /// List the immediate children of `parent` in lexical path order.
    ///
    /// The result is an owned snapshot taken in one read critical
    /// section; later mutations do not affect it. Fails with
    /// `NamespaceNotFound` if `parent` itself does not exist.
    pub fn list(&self, parent: &str) -> Result<Vec<(NamespaceId, NamespacePath)>> {
        let parent = NamespacePath::parse(parent)?;
        let index = self.index.read();
        if !parent.is_root() && !index.contains_key(parent.as_str()) {
            return Err(Error::NamespaceNotFound(parent.as_str().to_string()));
        }
        Ok(index
            .range(parent.as_str().to_string()..)
            .skip_while(|(key, _)| key.as_str() == parent.as_str())
            .take_while(|(key, _)| key.starts_with(parent.as_str()))
            .filter(|(_, ns)| parent.is_parent_of(&ns.path))
            .map(|(_, ns)| (ns.id.clone(), ns.path.clone()))
            .collect())
    }

    /// Create a namespace or replace its metadata in place.
    ///
    /// Creation requires the parent to already exist and generates a
    /// fresh ID; replacement keeps the ID. Re-setting identical metadata
    /// is a no-op. An absent `metadata` clears all metadata.
    pub fn set(&self, path: &str, metadata: Option<CustomMetadata>) -> Result<NamespaceId> {
        let path = NamespacePath::parse(path)?;
        if path.is_root() {
            return Err(Error::RootForbidden);
        }
        let metadata = metadata::replace(metadata);
        metadata::check_size(&metadata, self.config.max_metadata_bytes)?;

        loop {
            if self.index.read().contains_key(path.as_str()) {
                // Metadata-only branch: per-path lock, no tree lock
                let lock = self.path_lock(path.as_str());
                let _guard = lock.lock();
                let Some(mut ns) = self.index.read().get(path.as_str()).cloned() else {
                    // deleted underneath us, retry as a create
                    continue;
                };
                if ns.custom_metadata == metadata {
                    return Ok(ns.id);
                }
                ns.custom_metadata = metadata;
                self.persist(&ns)?;
                let id = ns.id.clone();
                self.index.write().insert(path.as_str().to_string(), ns);
                debug!("replaced metadata of namespace {path:?}");
                return Ok(id);
            }

            let _guard = self.structural.lock();
            if self.index.read().contains_key(path.as_str()) {
                // created underneath us, retry as a replace
                continue;
            }
            let parent = path.parent().ok_or(Error::RootForbidden)?;
            if !parent.is_root() && !self.index.read().contains_key(parent.as_str()) {
                return Err(Error::ParentNotFound(parent.as_str().to_string()));
            }
            let ns = Namespace {
                id: self.generate_id(),
                path: path.clone(),
                custom_metadata: metadata,
            };
            self.persist(&ns)?;
            let id = ns.id.clone();
            self.index.write().insert(path.as_str().to_string(), ns);
            debug!("created namespace {path:?} with ID {id}");
            return Ok(id);
        }
    }

    /// Merge a metadata delta into an existing namespace.
    ///
    /// `Some(v)` in the delta sets a key, `None` removes it, omitted keys
    /// are preserved. Fails with `NamespaceNotFound` if the namespace
    /// does not exist.
    pub fn patch(&self, path: &str, delta: MetadataDelta) -> Result<NamespaceId> {
        let path = NamespacePath::parse(path)?;
        if path.is_root() {
            return Err(Error::RootForbidden);
        }

        let lock = self.path_lock(path.as_str());
        let _guard = lock.lock();
        let Some(mut ns) = self.index.read().get(path.as_str()).cloned() else {
            return Err(Error::NamespaceNotFound(path.as_str().to_string()));
        };
        let merged = metadata::merge(&ns.custom_metadata, &delta);
        metadata::check_size(&merged, self.config.max_metadata_bytes)?;
        if merged == ns.custom_metadata {
            return Ok(ns.id);
        }
        ns.custom_metadata = merged;
        self.persist(&ns)?;
        let id = ns.id.clone();
        self.index.write().insert(path.as_str().to_string(), ns);
        debug!("patched metadata of namespace {path:?}");
        Ok(id)
    }

    /// Delete a namespace. The subtree must be empty; the ID is retired
    /// permanently and never reissued.
    pub fn delete(&self, path: &str) -> Result<()> {
        let path = NamespacePath::parse(path)?;
        if path.is_root() {
            return Err(Error::RootForbidden);
        }

        let _structural = self.structural.lock();
        // Also hold the path lock so an in-flight metadata write on this
        // namespace cannot interleave with the removal.
        let lock = self.path_lock(path.as_str());
        let _path_guard = lock.lock();

        let ns = {
            let index = self.index.read();
            let Some(ns) = index.get(path.as_str()).cloned() else {
                return Err(Error::NamespaceNotFound(path.as_str().to_string()));
            };
            // Only the immediate lexical successor can be a descendant,
            // so the check is one bounded probe, not a scan.
            let has_children = index
                .range(path.as_str().to_string()..)
                .skip_while(|(key, _)| key.as_str() == path.as_str())
                .take_while(|(key, _)| key.starts_with(path.as_str()))
                .next()
                .is_some();
            if has_children {
                return Err(Error::HasChildren(path.as_str().to_string()));
            }
            ns
        };

        // Marker first: if we crash between the two writes, the rebuild
        // sees the record and drops the stale marker.
        self.backend.put(&retired_key(ns.id.as_str()), &[])?;
        if let Err(e) = self.backend.delete(&record_key(path.as_str())) {
            // a failed delete must not retire the ID
            let _ = self.backend.delete(&retired_key(ns.id.as_str()));
            return Err(e);
        }

        self.retired.write().insert(ns.id.as_str().to_string());
        self.index.write().remove(path.as_str());
        debug!("deleted namespace {path:?}, retired ID {}", ns.id);
        Ok(())
    }

    fn persist(&self, ns: &Namespace) -> Result<()> {
        let bytes = serde_json::to_vec(ns).map_err(|e| Error::Serialization(e.to_string()))?;
        self.backend.put(&record_key(ns.path.as_str()), &bytes)
    }

    fn path_lock(&self, path: &str) -> Arc<Mutex<()>> {
        self.path_locks
            .entry(path.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Generate an ID that is neither live nor retired.
    fn generate_id(&self) -> NamespaceId {
        let retired = self.retired.read();
        let index = self.index.read();
        loop {
            let id = NamespaceId::generate();
            if retired.contains(id.as_str()) {
                continue;
            }
            if index.values().any(|ns| ns.id == id) {
                continue;
            }
            return id;
        }
    }
}
