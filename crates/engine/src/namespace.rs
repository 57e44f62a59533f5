//! Namespace lifecycle
//!
//! A namespace bundles its dictionary and triple store behind one
//! read-write lock (writes are serialized, reads see a consistent
//! snapshot) with a separately locked vector store. Namespaces are
//! created lazily on first write and destroyed eagerly on delete,
//! cascading to quads, provenance, vectors, and the on-disk directory.

use crate::{EngineConfig, EngineError, EngineResult};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rdf_model::{Dictionary, NodeId, Term, TripleId};
use reasoning::RuleSet;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use storage::{
    load_namespace, IdTriple, InsertOutcome, Manifest, NamespaceLog, Provenance, TripleStore,
};
use vector_index::{HnswParams, VectorStore};

/// Dictionary, store, and log of one namespace under its joint lock
pub struct GraphState {
    /// Term ↔ id mapping
    pub dictionary: Dictionary,
    /// Quad set with provenance
    pub store: TripleStore,
    log: Option<NamespaceLog>,
}

impl GraphState {
    fn fresh() -> Self {
        Self {
            dictionary: Dictionary::new(),
            store: TripleStore::new(),
            log: None,
        }
    }

    /// Intern a term, appending a dictionary record when it is new
    pub fn intern(&mut self, term: &Term) -> EngineResult<NodeId> {
        let before = self.dictionary.len();
        let id = self.dictionary.intern(term);
        if self.dictionary.len() > before {
            if let Some(log) = &mut self.log {
                log.append_term(id, term)?;
            }
        }
        Ok(id)
    }

    /// Append dictionary records for entries allocated since `from_len`.
    ///
    /// For callers that intern through `&mut Dictionary` directly (the
    /// reasoner's schema vocabulary) and still need the log complete.
    pub fn sync_dictionary_log(&mut self, from_len: usize) -> EngineResult<()> {
        if self.log.is_none() || self.dictionary.len() == from_len {
            return Ok(());
        }
        let entries: Vec<(NodeId, Term)> = self
            .dictionary
            .iter()
            .skip(from_len)
            .map(|(id, term)| (id, term.clone()))
            .collect();
        if let Some(log) = &mut self.log {
            for (id, term) in entries {
                log.append_term(id, &term)?;
            }
        }
        Ok(())
    }

    /// Insert a quad, appending a log record when it is new
    pub fn insert(
        &mut self,
        triple: IdTriple,
        provenance: Provenance,
    ) -> EngineResult<InsertOutcome> {
        let outcome = self.store.insert(triple, provenance);
        if outcome.added {
            if let Some(log) = &mut self.log {
                let prov = self
                    .store
                    .provenance(outcome.id)
                    .cloned()
                    .ok_or_else(|| EngineError::Fatal("missing ledger row".to_string()))?;
                log.append_quad(outcome.id, &triple, &prov)?;
            }
        }
        Ok(outcome)
    }

    /// Insert a batch under one index pass, appending log records for
    /// the quads that were new
    pub fn insert_batch(
        &mut self,
        batch: Vec<(IdTriple, Provenance)>,
    ) -> EngineResult<storage::BatchOutcome> {
        let outcome = self.store.insert_batch(batch);
        if let Some(log) = &mut self.log {
            for (id, triple) in &outcome.added {
                let prov = self
                    .store
                    .provenance(*id)
                    .cloned()
                    .ok_or_else(|| EngineError::Fatal("missing ledger row".to_string()))?;
                log.append_quad(*id, triple, &prov)?;
            }
        }
        Ok(outcome)
    }

    /// Delete a quad (with cascade), appending tombstones
    pub fn delete(&mut self, id: TripleId) -> EngineResult<Vec<TripleId>> {
        let removed = self.store.delete(id)?;
        if let Some(log) = &mut self.log {
            for id in &removed {
                log.append_tombstone(*id)?;
            }
        }
        Ok(removed)
    }

    /// Flush buffered log records
    pub fn flush(&mut self) -> EngineResult<()> {
        if let Some(log) = &mut self.log {
            log.flush()?;
        }
        Ok(())
    }

    /// Rewrite the logs without tombstoned rows
    pub fn compact(&mut self) -> EngineResult<()> {
        if let Some(log) = &mut self.log {
            log.compact(&self.dictionary, &self.store)?;
        }
        Ok(())
    }

    fn write_manifest(&self, dimension: Option<usize>, vector_count: u64) -> EngineResult<()> {
        if let Some(log) = &self.log {
            log.write_manifest(&Manifest {
                dimension,
                triple_count: self.store.len() as u64,
                vector_count,
            })?;
        }
        Ok(())
    }
}

/// Descriptor returned by namespace listings
#[derive(Clone, Debug, Serialize)]
pub struct NamespaceInfo {
    /// Namespace name
    pub name: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Live quad count
    pub triple_count: usize,
    /// Live vector count
    pub vector_count: usize,
    /// Vector dimension, if fixed
    pub dimension: Option<usize>,
    /// Last materialized rule set
    pub reasoning_state: Option<RuleSet>,
}

/// One tenant: graph state plus vector store
pub struct Namespace {
    /// Namespace name
    pub name: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Dictionary + store + ledger under the joint lock
    pub graph: RwLock<GraphState>,
    /// Vector index with its own locking (writes are append-mostly)
    pub vectors: VectorStore,
    /// Last rule set materialized into this namespace
    pub reasoning_state: Mutex<Option<RuleSet>>,
}

impl Namespace {
    /// Snapshot counters into a descriptor
    pub fn info(&self) -> NamespaceInfo {
        NamespaceInfo {
            name: self.name.clone(),
            created_at: self.created_at,
            triple_count: self.graph.read().store.len(),
            vector_count: self.vectors.len(),
            dimension: self.vectors.dimension(),
            reasoning_state: *self.reasoning_state.lock(),
        }
    }

    /// Flush logs and manifest
    pub fn flush(&self) -> EngineResult<()> {
        let mut graph = self.graph.write();
        graph.flush()?;
        self.vectors.flush()?;
        graph.write_manifest(self.vectors.dimension(), self.vectors.len() as u64)?;
        Ok(())
    }
}

/// Table of live namespaces
pub struct NamespaceManager {
    data_dir: Option<PathBuf>,
    hnsw: HnswParams,
    namespaces: DashMap<String, Arc<Namespace>>,
}

impl NamespaceManager {
    /// Open the manager, loading every namespace found under the data root
    pub fn open(config: &EngineConfig) -> EngineResult<Self> {
        let manager = Self {
            data_dir: config.data_dir.clone(),
            hnsw: config.hnsw,
            namespaces: DashMap::new(),
        };

        if let Some(root) = &manager.data_dir {
            let ns_root = root.join("namespaces");
            if ns_root.exists() {
                for entry in std::fs::read_dir(&ns_root)
                    .map_err(|e| EngineError::Fatal(format!("cannot read {ns_root:?}: {e}")))?
                {
                    let entry =
                        entry.map_err(|e| EngineError::Fatal(format!("readdir: {e}")))?;
                    if !entry.path().is_dir() {
                        continue;
                    }
                    let name = entry.file_name().to_string_lossy().to_string();
                    let namespace = manager.load(&name)?;
                    tracing::info!(
                        namespace = %name,
                        triples = namespace.graph.read().store.len(),
                        vectors = namespace.vectors.len(),
                        "namespace loaded"
                    );
                    manager.namespaces.insert(name, namespace);
                }
            }
        }
        Ok(manager)
    }

    fn dir_for(&self, name: &str) -> Option<PathBuf> {
        self.data_dir
            .as_ref()
            .map(|root| root.join("namespaces").join(name))
    }

    fn load(&self, name: &str) -> EngineResult<Arc<Namespace>> {
        validate_name(name)?;
        let (graph, vectors) = match self.dir_for(name) {
            Some(dir) => {
                let (dictionary, store, log) = load_namespace(&dir)?;
                let vectors = VectorStore::open(&dir.join("index"), self.hnsw)?;
                (
                    GraphState {
                        dictionary,
                        store,
                        log: Some(log),
                    },
                    vectors,
                )
            }
            None => (GraphState::fresh(), VectorStore::in_memory(self.hnsw)),
        };
        Ok(Arc::new(Namespace {
            name: name.to_string(),
            created_at: Utc::now(),
            graph: RwLock::new(graph),
            vectors,
            reasoning_state: Mutex::new(None),
        }))
    }

    /// Read-only lookup; `None` when the namespace was never written
    pub fn get(&self, name: &str) -> Option<Arc<Namespace>> {
        self.namespaces.get(name).map(|e| e.value().clone())
    }

    /// Lazy create on first write
    pub fn get_or_create(&self, name: &str) -> EngineResult<Arc<Namespace>> {
        if let Some(ns) = self.get(name) {
            return Ok(ns);
        }
        validate_name(name)?;
        let entry = self.namespaces.entry(name.to_string());
        match entry {
            dashmap::mapref::entry::Entry::Occupied(e) => Ok(e.get().clone()),
            dashmap::mapref::entry::Entry::Vacant(e) => {
                let namespace = self.load(name)?;
                tracing::info!(namespace = %name, "namespace created");
                e.insert(namespace.clone());
                Ok(namespace)
            }
        }
    }

    /// Destructive delete; returns whether the namespace existed
    pub fn delete(&self, name: &str) -> EngineResult<bool> {
        let existed = self.namespaces.remove(name).is_some();
        if let Some(dir) = self.dir_for(name) {
            if dir.exists() {
                std::fs::remove_dir_all(&dir)
                    .map_err(|e| EngineError::Transient(format!("removing {dir:?}: {e}")))?;
                tracing::info!(namespace = %name, "namespace directory removed");
                return Ok(true);
            }
        }
        Ok(existed)
    }

    /// Snapshot descriptors of all live namespaces
    pub fn list(&self) -> Vec<NamespaceInfo> {
        let mut infos: Vec<_> = self.namespaces.iter().map(|e| e.value().info()).collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        infos
    }

    /// Flush every namespace (shutdown, periodic checkpoint)
    pub fn flush_all(&self) -> EngineResult<()> {
        for entry in self.namespaces.iter() {
            entry.value().flush()?;
        }
        Ok(())
    }

    /// Rewrite every namespace's logs, dropping tombstoned rows
    pub fn compact_all(&self) -> EngineResult<()> {
        for entry in self.namespaces.iter() {
            entry.value().graph.write().compact()?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> EngineResult<()> {
    if name.is_empty() || name.len() > 128 {
        return Err(EngineError::Validation(format!(
            "bad namespace name: {name:?}"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(EngineError::Validation(format!(
            "namespace names are [A-Za-z0-9_-]: {name:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_create_and_get() {
        let manager = NamespaceManager::open(&EngineConfig::in_memory()).unwrap();
        assert!(manager.get("ns1").is_none());
        let ns = manager.get_or_create("ns1").unwrap();
        assert_eq!(ns.name, "ns1");
        assert!(manager.get("ns1").is_some());
    }

    #[test]
    fn test_name_validation() {
        let manager = NamespaceManager::open(&EngineConfig::in_memory()).unwrap();
        assert!(manager.get_or_create("ok_name-1").is_ok());
        assert!(manager.get_or_create("").is_err());
        assert!(manager.get_or_create("../escape").is_err());
        assert!(manager.get_or_create("with space").is_err());
    }

    #[test]
    fn test_delete_removes_state() {
        let manager = NamespaceManager::open(&EngineConfig::in_memory()).unwrap();
        manager.get_or_create("ns1").unwrap();
        assert!(manager.delete("ns1").unwrap());
        assert!(manager.get("ns1").is_none());
        assert!(!manager.delete("ns1").unwrap());
    }

    #[test]
    fn test_persistent_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            data_dir: Some(tmp.path().to_path_buf()),
            ..EngineConfig::in_memory()
        };

        {
            let manager = NamespaceManager::open(&config).unwrap();
            let ns = manager.get_or_create("persisted").unwrap();
            {
                let mut graph = ns.graph.write();
                let s = graph.intern(&Term::iri("http://ex/a")).unwrap();
                let p = graph.intern(&Term::iri("http://ex/p")).unwrap();
                let o = graph.intern(&Term::literal("v")).unwrap();
                graph
                    .insert(IdTriple::new(s, p, o), Provenance::ingested("t", "unit"))
                    .unwrap();
            }
            ns.flush().unwrap();
        }

        let manager = NamespaceManager::open(&config).unwrap();
        let ns = manager.get("persisted").expect("reloaded");
        assert_eq!(ns.graph.read().store.len(), 1);
    }
}
